//! Bodies of the scheduled jobs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::{AnalyticsService, Matrix, OptimizationTip};
use crate::db::Database;
use crate::error::AppResult;
use crate::executions::ExecutionTracker;
use crate::models::NotificationKind;

const TIPS_PER_RUN: usize = 3;

/// Figures queued after the daily matrix refresh
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub total_apps: i64,
    pub total_agents: i64,
    pub new_agents: i64,
    pub opportunities: usize,
    pub tips: Vec<String>,
}

impl DailySummary {
    pub fn from_matrix(matrix: &Matrix) -> Self {
        Self {
            total_apps: matrix.total_apps,
            total_agents: matrix.total_agents,
            new_agents: matrix.new_agents,
            opportunities: matrix.integration_opportunities.len(),
            tips: matrix
                .optimization_tips
                .iter()
                .take(TIPS_PER_RUN)
                .map(|tip| tip.title.clone())
                .collect(),
        }
    }

    pub fn to_message(&self) -> String {
        let mut message = format!(
            "Daily AI Agent Report\n\nApps: {}\nAI Agents: {}\nNew Agents (24h): {}\nIntegration Opportunities: {}\n",
            self.total_apps, self.total_agents, self.new_agents, self.opportunities
        );
        if !self.tips.is_empty() {
            message.push_str("\nTop Tips:\n");
            for tip in &self.tips {
                message.push_str(&format!("- {}\n", tip));
            }
        }
        message
    }
}

pub fn tip_message(tip: &OptimizationTip) -> String {
    format!(
        "Optimization Tip: {}\n\n{}\n\nPotential Savings: {}",
        tip.title, tip.description, tip.potential_savings
    )
}

pub(super) fn daily_matrix_update(db: &Database, analytics: &AnalyticsService, now: DateTime<Utc>) -> AppResult<()> {
    let (_, matrix) = analytics.save_daily_snapshot(now.date_naive())?;
    let summary = DailySummary::from_matrix(&matrix);
    db.queue_notification(NotificationKind::DailySummary, &summary.to_message())?;
    Ok(())
}

pub(super) fn periodic_agent_analysis(tracker: &ExecutionTracker) -> AppResult<()> {
    let refreshed = tracker.refresh_all()?;
    log::info!("[SCHEDULER] Refreshed performance metrics for {} agents", refreshed);
    Ok(())
}

pub(super) fn optimization_tips(db: &Database, analytics: &AnalyticsService) -> AppResult<()> {
    let tips = analytics.optimization_recommendations()?;
    for tip in tips.iter().take(TIPS_PER_RUN) {
        db.queue_notification(NotificationKind::OptimizationTip, &tip_message(tip))?;
    }
    log::info!("[SCHEDULER] Queued {} optimization tips", tips.len().min(TIPS_PER_RUN));
    Ok(())
}

pub(super) fn weekly_summary(db: &Database, analytics: &AnalyticsService, now: DateTime<Utc>) -> AppResult<()> {
    let summary = analytics.weekly_summary(now.date_naive())?;
    db.queue_notification(NotificationKind::WeeklySummary, &summary.to_message())?;
    Ok(())
}
