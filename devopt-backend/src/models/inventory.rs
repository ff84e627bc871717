//! Tracked applications, the AI agents found inside them and their credentials

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An application whose AI usage is being tracked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedApp {
    pub id: i64,
    /// External workspace identifier, unique per app
    pub repl_id: String,
    pub name: String,
    pub url: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub file_count: i64,
    pub size_kb: f64,
    pub is_active: bool,
    pub last_modified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrackedApp {
    pub repl_id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_count: i64,
    #[serde(default)]
    pub size_kb: f64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Provider family an agent talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    OpenAi,
    Anthropic,
    Local,
    Custom,
}

impl AgentType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(AgentType::OpenAi),
            "anthropic" | "claude" => Some(AgentType::Anthropic),
            "local" => Some(AgentType::Local),
            "custom" => Some(AgentType::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::OpenAi => "openai",
            AgentType::Anthropic => "anthropic",
            AgentType::Local => "local",
            AgentType::Custom => "custom",
        }
    }

    /// Capitalized label used in generated advice
    pub fn title(&self) -> &'static str {
        match self {
            AgentType::OpenAi => "Openai",
            AgentType::Anthropic => "Anthropic",
            AgentType::Local => "Local",
            AgentType::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An AI agent detected inside a tracked app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAgent {
    pub id: i64,
    pub app_id: i64,
    pub agent_type: AgentType,
    pub agent_name: String,
    pub model_name: Option<String>,
    pub role_description: Option<String>,
    pub usage_frequency: i64,
    pub last_used: Option<DateTime<Utc>>,
    /// 0.0 to 1.0
    pub effectiveness_score: f64,
    /// Estimated monthly cost in USD
    pub cost_estimate: f64,
    pub features_used: Vec<String>,
    pub api_endpoints: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAiAgent {
    pub app_id: i64,
    pub agent_type: AgentType,
    pub agent_name: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub role_description: Option<String>,
    #[serde(default)]
    pub effectiveness_score: f64,
    #[serde(default)]
    pub cost_estimate: f64,
    #[serde(default)]
    pub features_used: Vec<String>,
    #[serde(default)]
    pub api_endpoints: Vec<String>,
}

/// Records that an app holds credentials for a service. Secret values are never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCredential {
    pub id: i64,
    pub app_id: i64,
    /// api_key, oauth, database_url, ...
    pub credential_type: String,
    pub service_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppCredential {
    pub credential_type: String,
    pub service_name: String,
}

/// Daily persisted copy of the app/agent matrix
#[derive(Debug, Clone, Serialize)]
pub struct MatrixSnapshot {
    pub id: i64,
    pub snapshot_date: NaiveDate,
    pub total_apps: i64,
    pub total_agents: i64,
    pub matrix_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_round_trip() {
        for t in [AgentType::OpenAi, AgentType::Anthropic, AgentType::Local, AgentType::Custom] {
            assert_eq!(AgentType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(AgentType::from_str("OpenAI"), Some(AgentType::OpenAi));
        assert_eq!(AgentType::from_str("gemini"), None);
    }

    #[test]
    fn test_agent_type_serde_matches_as_str() {
        let json = serde_json::to_string(&AgentType::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
    }
}
