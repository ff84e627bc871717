//! App/agent matrix and inventory analytics
//!
//! The pure builders live in `insights` and `report`; `AnalyticsService` loads
//! the inventory from the database and feeds it through them.

pub mod insights;
pub mod report;

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::AppResult;
use crate::models::{AiAgent, MatrixSnapshot, TrackedApp};

pub use insights::{IntegrationOpportunity, OptimizationTip, Priority, TipKind};
pub use report::{AnalyticsReport, LandingStats, WeeklySummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixApp {
    pub id: i64,
    pub name: String,
    pub language: Option<String>,
    pub agent_count: usize,
    pub last_modified: Option<DateTime<Utc>>,
    pub file_count: i64,
    pub size_kb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixAgent {
    pub id: i64,
    pub app_id: i64,
    pub app_name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub name: String,
    pub model: Option<String>,
    pub usage_frequency: i64,
    pub effectiveness_score: f64,
    pub cost_estimate: f64,
    pub features: Vec<String>,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub app_id: i64,
    pub agent_id: i64,
    /// 0.0 to 1.0
    pub strength: f64,
}

/// App-to-agent relationship matrix with the analysis derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matrix {
    pub apps: Vec<MatrixApp>,
    pub agents: Vec<MatrixAgent>,
    pub relationships: Vec<Relationship>,
    pub total_apps: i64,
    pub total_agents: i64,
    pub new_agents: i64,
    pub integration_opportunities: Vec<IntegrationOpportunity>,
    pub optimization_tips: Vec<OptimizationTip>,
}

pub fn relationship_strength(agent: &AiAgent) -> f64 {
    (agent.effectiveness_score + agent.usage_frequency as f64 / 100.0).min(1.0)
}

/// Assemble the matrix from an already loaded inventory
pub fn build_matrix(
    apps: &[TrackedApp],
    agents: &[AiAgent],
    new_agents: i64,
    integration_opportunities: Vec<IntegrationOpportunity>,
    optimization_tips: Vec<OptimizationTip>,
) -> Matrix {
    let app_name = |id: i64| {
        apps.iter()
            .find(|a| a.id == id)
            .map(|a| a.name.clone())
            .unwrap_or_default()
    };

    Matrix {
        apps: apps
            .iter()
            .map(|app| MatrixApp {
                id: app.id,
                name: app.name.clone(),
                language: app.language.clone(),
                agent_count: agents.iter().filter(|a| a.app_id == app.id).count(),
                last_modified: app.last_modified,
                file_count: app.file_count,
                size_kb: app.size_kb,
            })
            .collect(),
        agents: agents
            .iter()
            .map(|agent| MatrixAgent {
                id: agent.id,
                app_id: agent.app_id,
                app_name: app_name(agent.app_id),
                agent_type: agent.agent_type.to_string(),
                name: agent.agent_name.clone(),
                model: agent.model_name.clone(),
                usage_frequency: agent.usage_frequency,
                effectiveness_score: agent.effectiveness_score,
                cost_estimate: agent.cost_estimate,
                features: agent.features_used.clone(),
                last_used: agent.last_used,
            })
            .collect(),
        relationships: agents
            .iter()
            .map(|agent| Relationship {
                app_id: agent.app_id,
                agent_id: agent.id,
                strength: relationship_strength(agent),
            })
            .collect(),
        total_apps: apps.len() as i64,
        total_agents: agents.len() as i64,
        new_agents,
        integration_opportunities,
        optimization_tips,
    }
}

/// Analytics over the tracked inventory
pub struct AnalyticsService {
    db: Arc<Database>,
}

impl AnalyticsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn inventory(&self) -> AppResult<(Vec<TrackedApp>, Vec<AiAgent>)> {
        Ok((self.db.list_apps(true)?, self.db.list_active_agents(None)?))
    }

    pub fn generate_matrix(&self) -> AppResult<Matrix> {
        let (apps, agents) = self.inventory()?;
        let credentials = self.db.list_active_credentials()?;
        let new_agents = self
            .db
            .count_agents_created_since(Utc::now() - Duration::hours(24))?;

        Ok(build_matrix(
            &apps,
            &agents,
            new_agents,
            insights::integration_opportunities(&apps, &agents),
            insights::optimization_tips(&apps, &agents, &credentials),
        ))
    }

    /// Replace the snapshot for `day` with a freshly generated matrix
    pub fn save_daily_snapshot(&self, day: NaiveDate) -> AppResult<(MatrixSnapshot, Matrix)> {
        let matrix = self.generate_matrix()?;
        let data = serde_json::to_value(&matrix)?;
        let snapshot = self
            .db
            .save_snapshot(day, matrix.total_apps, matrix.total_agents, &data)?;
        log::info!(
            "[ANALYTICS] Saved matrix snapshot for {} ({} apps, {} agents)",
            day,
            matrix.total_apps,
            matrix.total_agents
        );
        Ok((snapshot, matrix))
    }

    /// Tips from the latest snapshot, or freshly computed when no snapshot has any
    pub fn optimization_recommendations(&self) -> AppResult<Vec<OptimizationTip>> {
        if let Some(snapshot) = self.db.latest_snapshot()? {
            match serde_json::from_value::<Matrix>(snapshot.matrix_data) {
                Ok(matrix) if !matrix.optimization_tips.is_empty() => return Ok(matrix.optimization_tips),
                Ok(_) => {}
                Err(e) => log::warn!("[ANALYTICS] Ignoring unreadable snapshot {}: {}", snapshot.id, e),
            }
        }

        let (apps, agents) = self.inventory()?;
        let credentials = self.db.list_active_credentials()?;
        Ok(insights::optimization_tips(&apps, &agents, &credentials))
    }

    pub fn landing_stats(&self) -> AppResult<LandingStats> {
        let (apps, agents) = self.inventory()?;
        Ok(report::landing_stats(apps.len() as i64, agents.len() as i64))
    }

    pub fn weekly_summary(&self, today: NaiveDate) -> AppResult<WeeklySummary> {
        let (apps, agents) = self.inventory()?;
        let top = self.db.top_agents_by_usage(5)?;
        Ok(report::weekly_summary(today, &apps, &agents, &top))
    }

    pub fn agent_distribution(&self) -> AppResult<Vec<(String, i64)>> {
        Ok(self.db.agent_distribution()?)
    }

    pub fn analytics_report(&self) -> AppResult<AnalyticsReport> {
        let (apps, agents) = self.inventory()?;
        Ok(report::analytics_report(&apps, &agents))
    }
}
