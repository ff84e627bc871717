use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DailySummary,
    OptimizationTip,
    WeeklySummary,
}

impl NotificationKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily_summary" => Some(NotificationKind::DailySummary),
            "optimization_tip" => Some(NotificationKind::OptimizationTip),
            "weekly_summary" => Some(NotificationKind::WeeklySummary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DailySummary => "daily_summary",
            NotificationKind::OptimizationTip => "optimization_tip",
            NotificationKind::WeeklySummary => "weekly_summary",
        }
    }
}

/// Outbound message produced by a background job
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub sent: bool,
    pub created_at: DateTime<Utc>,
}
