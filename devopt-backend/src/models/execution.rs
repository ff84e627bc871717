use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Success,
    Failed,
    Timeout,
}

impl ExecutionStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ExecutionStatus::Pending),
            "success" => Some(ExecutionStatus::Success),
            "failed" => Some(ExecutionStatus::Failed),
            "timeout" => Some(ExecutionStatus::Timeout),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of a coordination agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentExecution {
    pub id: i64,
    pub execution_id: String,
    pub agent_key: String,
    pub agent_name: String,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub status: ExecutionStatus,
    pub execution_time_ms: Option<i64>,
    pub tokens_used: i64,
    pub cost_usd: f64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostEfficiency {
    Excellent,
    Good,
    Average,
    Poor,
}

impl CostEfficiency {
    /// Rate an average per-run cost in USD
    pub fn from_avg_cost(avg_cost: f64) -> Self {
        if avg_cost < 0.01 {
            CostEfficiency::Excellent
        } else if avg_cost < 0.05 {
            CostEfficiency::Good
        } else if avg_cost < 0.10 {
            CostEfficiency::Average
        } else {
            CostEfficiency::Poor
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "excellent" => Some(CostEfficiency::Excellent),
            "good" => Some(CostEfficiency::Good),
            "average" => Some(CostEfficiency::Average),
            "poor" => Some(CostEfficiency::Poor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CostEfficiency::Excellent => "excellent",
            CostEfficiency::Good => "good",
            CostEfficiency::Average => "average",
            CostEfficiency::Poor => "poor",
        }
    }
}

/// Aggregated performance figures for one agent key
#[derive(Debug, Clone, Serialize)]
pub struct AgentPerformanceMetrics {
    pub agent_key: String,
    pub agent_name: String,
    pub total_executions: i64,
    pub successful_executions: i64,
    pub failed_executions: i64,
    /// Percentage, 0 to 100
    pub success_rate: f64,
    pub avg_execution_time_ms: f64,
    pub min_execution_time_ms: Option<i64>,
    pub max_execution_time_ms: Option<i64>,
    pub reliability_score: f64,
    pub efficiency_score: f64,
    pub total_cost_usd: f64,
    pub avg_cost_per_execution: f64,
    pub cost_efficiency_rating: CostEfficiency,
    pub peak_usage_hour: Option<u32>,
    pub recommended_concurrency: i64,
    pub last_execution: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_efficiency_thresholds() {
        assert_eq!(CostEfficiency::from_avg_cost(0.0), CostEfficiency::Excellent);
        assert_eq!(CostEfficiency::from_avg_cost(0.01), CostEfficiency::Good);
        assert_eq!(CostEfficiency::from_avg_cost(0.049), CostEfficiency::Good);
        assert_eq!(CostEfficiency::from_avg_cost(0.05), CostEfficiency::Average);
        assert_eq!(CostEfficiency::from_avg_cost(0.10), CostEfficiency::Poor);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ExecutionStatus::from_str("timeout"), Some(ExecutionStatus::Timeout));
        assert_eq!(ExecutionStatus::Success.to_string(), "success");
        assert_eq!(ExecutionStatus::from_str("done"), None);
    }
}
