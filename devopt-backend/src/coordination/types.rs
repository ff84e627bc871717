use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
    EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    CodeAnalysis,
    CreativeDirection,
    FinancialAnalysis,
    ContentGeneration,
    PerformanceOptimization,
    MarketIntelligence,
    TechnicalStrategy,
    MultimediaCreation,
    RiskAssessment,
    SentimentAnalysis,
}

impl Capability {
    /// Words matched against agent specializations during selection
    pub fn keywords(&self) -> impl Iterator<Item = &'static str> {
        let name: &'static str = self.into();
        name.split('_')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestType {
    Development,
    Creative,
    Financial,
    Analytics,
    Multimedia,
    Optimization,
    Strategic,
}

impl RequestType {
    /// Capabilities used when a request does not name any
    pub fn default_capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            RequestType::Development => &[CodeAnalysis, PerformanceOptimization, TechnicalStrategy],
            RequestType::Creative => &[CreativeDirection, ContentGeneration],
            RequestType::Financial => &[FinancialAnalysis, MarketIntelligence, RiskAssessment],
            RequestType::Analytics => &[SentimentAnalysis, MarketIntelligence],
            RequestType::Multimedia => &[MultimediaCreation],
            RequestType::Optimization => &[PerformanceOptimization],
            RequestType::Strategic => &[TechnicalStrategy, MarketIntelligence],
        }
    }

    pub fn recommendation(&self) -> Option<&'static str> {
        match self {
            RequestType::Development => Some("Consider integrating multiple AI services for enhanced functionality"),
            RequestType::Creative => Some("Leverage multimedia services for comprehensive creative output"),
            RequestType::Financial => Some("Combine market analysis with risk assessment for balanced decisions"),
            _ => None,
        }
    }

    pub fn next_steps(&self) -> &'static [&'static str] {
        match self {
            RequestType::Development => &[
                "Review code analysis recommendations",
                "Implement performance optimizations",
                "Plan integration with suggested AI services",
            ],
            RequestType::Creative => &[
                "Develop creative brief based on strategy recommendations",
                "Create multimedia assets using available services",
                "Test creative concepts with target audience",
            ],
            RequestType::Financial => &[
                "Analyze market intelligence insights",
                "Assess investment recommendations",
                "Develop risk mitigation strategies",
            ],
            _ => &[],
        }
    }
}

fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_priority() -> u8 {
    5
}

/// A request for coordinated help from several agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationRequest {
    #[serde(default = "new_request_id")]
    pub request_id: String,
    pub request_type: RequestType,
    pub description: String,
    #[serde(default)]
    pub context: Value,
    /// Empty means the request type's defaults
    #[serde(default)]
    pub required_capabilities: Vec<Capability>,
    /// 1 (lowest) to 10
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub requesting_app: Option<String>,
}

impl CoordinationRequest {
    pub fn new(request_type: RequestType, description: impl Into<String>) -> Self {
        Self {
            request_id: new_request_id(),
            request_type,
            description: description.into(),
            context: Value::Null,
            required_capabilities: Vec::new(),
            priority: default_priority(),
            requesting_app: None,
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        if self.required_capabilities.is_empty() {
            self.request_type.default_capabilities()
        } else {
            self.required_capabilities.as_slice()
        }
    }
}

/// A coordination agent as listed in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub key: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
    pub specializations: Vec<String>,
    #[serde(default = "available_by_default")]
    pub available: bool,
    pub cost_per_request: f64,
    /// Seconds
    pub avg_response_time: f64,
}

fn available_by_default() -> bool {
    true
}

/// Capabilities assigned to one agent for a request
#[derive(Debug, Clone)]
pub struct Allocation {
    pub agent: AgentProfile,
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentContribution {
    pub agent_key: String,
    pub agent_name: String,
    /// First capability the agent was assigned
    pub capability: Capability,
    pub response_data: Value,
    pub confidence_score: f64,
    /// Seconds
    pub processing_time: f64,
    pub cost_estimate: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportingInsight {
    pub agent: String,
    pub capability: Capability,
    pub insight: Value,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinatedResponse {
    pub request_id: String,
    pub primary_response: Value,
    pub supporting_insights: Vec<SupportingInsight>,
    pub agent_contributions: Vec<AgentContribution>,
    pub overall_confidence: f64,
    pub total_cost: f64,
    /// Seconds
    pub processing_time: f64,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

impl CoordinatedResponse {
    /// Response for a request no agent could take on
    pub fn failed(request_id: &str, error: &str, processing_time: f64) -> Self {
        Self {
            request_id: request_id.to_string(),
            primary_response: serde_json::json!({ "error": error }),
            supporting_insights: Vec::new(),
            agent_contributions: Vec::new(),
            overall_confidence: 0.0,
            total_cost: 0.0,
            processing_time,
            recommendations: vec!["Request coordination failed - please try again".to_string()],
            next_steps: vec!["Review request parameters and retry".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::CodeAnalysis.to_string(), "code_analysis");
        assert_eq!(Capability::from_str("risk_assessment").unwrap(), Capability::RiskAssessment);
        let words: Vec<_> = Capability::PerformanceOptimization.keywords().collect();
        assert_eq!(words, vec!["performance", "optimization"]);
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: CoordinationRequest =
            serde_json::from_str(r#"{"request_type": "development", "description": "speed up the api"}"#).unwrap();
        assert_eq!(request.priority, 5);
        assert!(!request.request_id.is_empty());
        assert_eq!(
            request.capabilities(),
            &[
                Capability::CodeAnalysis,
                Capability::PerformanceOptimization,
                Capability::TechnicalStrategy
            ]
        );

        assert!(serde_json::from_str::<CoordinationRequest>(r#"{"request_type": "general", "description": "x"}"#).is_err());
    }

    #[test]
    fn test_request_type_guidance() {
        assert_eq!(RequestType::Financial.next_steps().len(), 3);
        assert!(RequestType::Analytics.next_steps().is_empty());
        assert!(RequestType::Strategic.recommendation().is_none());
    }
}
