//! Agent execution tracking and the performance metrics derived from it

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{AgentExecution, AgentPerformanceMetrics, CostEfficiency, ExecutionStatus};

/// Upper bound on the runs folded into one agent's metrics
const METRICS_WINDOW: usize = 10_000;
/// Runs one worker is expected to absorb per hour
const RUNS_PER_WORKER_HOUR: i64 = 10;

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub output: Option<Value>,
    pub execution_time_ms: i64,
    pub tokens_used: i64,
    pub cost_usd: f64,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn success(output: Value, execution_time_ms: i64, tokens_used: i64, cost_usd: f64) -> Self {
        Self {
            status: ExecutionStatus::Success,
            output: Some(output),
            execution_time_ms,
            tokens_used,
            cost_usd,
            error: None,
        }
    }

    pub fn failure(status: ExecutionStatus, error: impl Into<String>, execution_time_ms: i64) -> Self {
        Self {
            status,
            output: None,
            execution_time_ms,
            tokens_used: 0,
            cost_usd: 0.0,
            error: Some(error.into()),
        }
    }
}

/// Aggregate a set of runs for one agent. Pending runs are ignored.
pub fn compute_metrics(
    agent_key: &str,
    agent_name: &str,
    executions: &[AgentExecution],
    now: DateTime<Utc>,
) -> AgentPerformanceMetrics {
    let finished: Vec<&AgentExecution> = executions
        .iter()
        .filter(|e| e.status != ExecutionStatus::Pending)
        .collect();

    let total = finished.len() as i64;
    let successful = finished
        .iter()
        .filter(|e| e.status == ExecutionStatus::Success)
        .count() as i64;
    let success_rate = if total > 0 {
        successful as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let times: Vec<i64> = finished.iter().filter_map(|e| e.execution_time_ms).collect();
    let avg_time = if times.is_empty() {
        0.0
    } else {
        times.iter().sum::<i64>() as f64 / times.len() as f64
    };
    // Runs averaging a second or less score full marks
    let efficiency_score = if avg_time > 0.0 {
        (100.0 * (1000.0 / avg_time).min(1.0)).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let total_cost: f64 = finished.iter().map(|e| e.cost_usd).sum();
    let avg_cost = if total > 0 { total_cost / total as f64 } else { 0.0 };

    let mut per_hour: BTreeMap<u32, i64> = BTreeMap::new();
    for execution in &finished {
        *per_hour.entry(execution.started_at.hour()).or_default() += 1;
    }
    // Earliest hour wins ties
    let peak = per_hour
        .iter()
        .fold(None, |best: Option<(u32, i64)>, (&hour, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((hour, count)),
        });
    let recommended_concurrency = peak
        .map(|(_, count)| (count + RUNS_PER_WORKER_HOUR - 1) / RUNS_PER_WORKER_HOUR)
        .unwrap_or(1)
        .max(1);

    AgentPerformanceMetrics {
        agent_key: agent_key.to_string(),
        agent_name: agent_name.to_string(),
        total_executions: total,
        successful_executions: successful,
        failed_executions: total - successful,
        success_rate,
        avg_execution_time_ms: avg_time,
        min_execution_time_ms: times.iter().min().copied(),
        max_execution_time_ms: times.iter().max().copied(),
        reliability_score: success_rate,
        efficiency_score,
        total_cost_usd: total_cost,
        avg_cost_per_execution: avg_cost,
        cost_efficiency_rating: CostEfficiency::from_avg_cost(avg_cost),
        peak_usage_hour: peak.map(|(hour, _)| hour),
        recommended_concurrency,
        last_execution: finished.iter().map(|e| e.started_at).max(),
        updated_at: now,
    }
}

/// Records agent runs and keeps per-agent metrics current
pub struct ExecutionTracker {
    db: Arc<Database>,
}

impl ExecutionTracker {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a pending run and return its execution id
    pub fn start_execution(&self, agent_key: &str, agent_name: &str, input: &Value) -> AppResult<String> {
        let execution_id = Uuid::new_v4().to_string();
        self.db
            .insert_execution(&execution_id, agent_key, agent_name, input, Utc::now())?;
        log::debug!("[EXECUTIONS] Started {} for {}", execution_id, agent_key);
        Ok(execution_id)
    }

    /// Returns false when the execution id is unknown
    pub fn complete_execution(&self, execution_id: &str, outcome: &ExecutionOutcome) -> AppResult<bool> {
        let updated = self.db.finish_execution(
            execution_id,
            outcome.status,
            outcome.output.as_ref(),
            outcome.execution_time_ms,
            outcome.tokens_used,
            outcome.cost_usd,
            outcome.error.as_deref(),
        )?;
        if !updated {
            log::warn!("[EXECUTIONS] Unknown execution id {}", execution_id);
        }
        Ok(updated)
    }

    /// Recompute and store metrics for one agent. None when it has never run.
    pub fn refresh_metrics(&self, agent_key: &str) -> AppResult<Option<AgentPerformanceMetrics>> {
        let executions = self.db.list_executions(Some(agent_key), METRICS_WINDOW)?;
        let Some(latest) = executions.first() else {
            return Ok(None);
        };
        let metrics = compute_metrics(agent_key, &latest.agent_name, &executions, Utc::now());
        self.db.upsert_metrics(&metrics)?;
        Ok(Some(metrics))
    }

    /// Refresh every agent that has history, returning how many were updated
    pub fn refresh_all(&self) -> AppResult<usize> {
        let mut refreshed = 0;
        for key in self.db.execution_agent_keys()? {
            if self.refresh_metrics(&key)?.is_some() {
                refreshed += 1;
            }
        }
        Ok(refreshed)
    }

    pub fn history(&self, agent_key: Option<&str>, limit: usize) -> AppResult<Vec<AgentExecution>> {
        Ok(self.db.list_executions(agent_key, limit)?)
    }

    pub fn performance(&self) -> AppResult<Vec<AgentPerformanceMetrics>> {
        Ok(self.db.list_metrics()?)
    }

    pub fn agent_performance(&self, agent_key: &str) -> AppResult<AgentPerformanceMetrics> {
        self.db
            .get_metrics(agent_key)?
            .ok_or_else(|| AppError::not_found(format!("Metrics for {}", agent_key)))
    }
}
