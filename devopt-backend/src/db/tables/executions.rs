//! Agent execution records and aggregated performance metrics

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{parse_timestamp, Database};
use crate::models::{AgentExecution, AgentPerformanceMetrics, CostEfficiency, ExecutionStatus};

const EXECUTION_COLUMNS: &str = "id, execution_id, agent_key, agent_name, input_data, output_data, status, \
                                 execution_time_ms, tokens_used, cost_usd, error_message, started_at, completed_at";

const METRICS_COLUMNS: &str = "agent_key, agent_name, total_executions, successful_executions, failed_executions, \
                               success_rate, avg_execution_time_ms, min_execution_time_ms, max_execution_time_ms, \
                               reliability_score, efficiency_score, total_cost_usd, avg_cost_per_execution, \
                               cost_efficiency_rating, peak_usage_hour, recommended_concurrency, last_execution, updated_at";

fn row_to_execution(row: &Row) -> SqliteResult<AgentExecution> {
    let input: String = row.get(4)?;
    let output: Option<String> = row.get(5)?;
    let status: String = row.get(6)?;
    let started_at: String = row.get(11)?;
    let completed_at: Option<String> = row.get(12)?;

    Ok(AgentExecution {
        id: row.get(0)?,
        execution_id: row.get(1)?,
        agent_key: row.get(2)?,
        agent_name: row.get(3)?,
        input_data: serde_json::from_str(&input).unwrap_or(serde_json::Value::Null),
        output_data: output.and_then(|o| serde_json::from_str(&o).ok()),
        status: ExecutionStatus::from_str(&status).unwrap_or(ExecutionStatus::Failed),
        execution_time_ms: row.get(7)?,
        tokens_used: row.get(8)?,
        cost_usd: row.get(9)?,
        error_message: row.get(10)?,
        started_at: parse_timestamp(11, &started_at)?,
        completed_at: completed_at.map(|s| parse_timestamp(12, &s)).transpose()?,
    })
}

fn row_to_metrics(row: &Row) -> SqliteResult<AgentPerformanceMetrics> {
    let rating: String = row.get(13)?;
    let peak: Option<i64> = row.get(14)?;
    let last_execution: Option<String> = row.get(16)?;
    let updated_at: String = row.get(17)?;

    Ok(AgentPerformanceMetrics {
        agent_key: row.get(0)?,
        agent_name: row.get(1)?,
        total_executions: row.get(2)?,
        successful_executions: row.get(3)?,
        failed_executions: row.get(4)?,
        success_rate: row.get(5)?,
        avg_execution_time_ms: row.get(6)?,
        min_execution_time_ms: row.get(7)?,
        max_execution_time_ms: row.get(8)?,
        reliability_score: row.get(9)?,
        efficiency_score: row.get(10)?,
        total_cost_usd: row.get(11)?,
        avg_cost_per_execution: row.get(12)?,
        cost_efficiency_rating: CostEfficiency::from_str(&rating).unwrap_or(CostEfficiency::Average),
        peak_usage_hour: peak.map(|h| h as u32),
        recommended_concurrency: row.get(15)?,
        last_execution: last_execution.map(|s| parse_timestamp(16, &s)).transpose()?,
        updated_at: parse_timestamp(17, &updated_at)?,
    })
}

impl Database {
    /// Record a run as pending
    pub fn insert_execution(
        &self,
        execution_id: &str,
        agent_key: &str,
        agent_name: &str,
        input_data: &serde_json::Value,
        started_at: DateTime<Utc>,
    ) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO agent_executions (execution_id, agent_key, agent_name, input_data, status, started_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            params![
                execution_id,
                agent_key,
                agent_name,
                input_data.to_string(),
                started_at.to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Close out a pending run. Returns false when the execution id is unknown.
    #[allow(clippy::too_many_arguments)]
    pub fn finish_execution(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        output_data: Option<&serde_json::Value>,
        execution_time_ms: i64,
        tokens_used: i64,
        cost_usd: f64,
        error_message: Option<&str>,
    ) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agent_executions
             SET status = ?1, output_data = ?2, execution_time_ms = ?3, tokens_used = ?4,
                 cost_usd = ?5, error_message = ?6, completed_at = ?7
             WHERE execution_id = ?8",
            params![
                status.as_str(),
                output_data.map(|v| v.to_string()),
                execution_time_ms,
                tokens_used,
                cost_usd,
                error_message,
                Utc::now().to_rfc3339(),
                execution_id
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn get_execution(&self, execution_id: &str) -> SqliteResult<Option<AgentExecution>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM agent_executions WHERE execution_id = ?1", EXECUTION_COLUMNS),
            [execution_id],
            row_to_execution,
        )
        .optional()
    }

    /// Most recent runs first, optionally for a single agent
    pub fn list_executions(&self, agent_key: Option<&str>, limit: usize) -> SqliteResult<Vec<AgentExecution>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agent_executions
             WHERE (?1 IS NULL OR agent_key = ?1)
             ORDER BY started_at DESC, id DESC
             LIMIT ?2",
            EXECUTION_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![agent_key, limit as i64], row_to_execution)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// Every agent key that has at least one recorded run
    pub fn execution_agent_keys(&self) -> SqliteResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT DISTINCT agent_key FROM agent_executions ORDER BY agent_key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(keys)
    }

    pub fn upsert_metrics(&self, m: &AgentPerformanceMetrics) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO agent_performance_metrics ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                METRICS_COLUMNS
            ),
            params![
                m.agent_key,
                m.agent_name,
                m.total_executions,
                m.successful_executions,
                m.failed_executions,
                m.success_rate,
                m.avg_execution_time_ms,
                m.min_execution_time_ms,
                m.max_execution_time_ms,
                m.reliability_score,
                m.efficiency_score,
                m.total_cost_usd,
                m.avg_cost_per_execution,
                m.cost_efficiency_rating.as_str(),
                m.peak_usage_hour.map(|h| h as i64),
                m.recommended_concurrency,
                m.last_execution.map(|d| d.to_rfc3339()),
                m.updated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_metrics(&self, agent_key: &str) -> SqliteResult<Option<AgentPerformanceMetrics>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM agent_performance_metrics WHERE agent_key = ?1", METRICS_COLUMNS),
            [agent_key],
            row_to_metrics,
        )
        .optional()
    }

    /// All metrics, most reliable first
    pub fn list_metrics(&self) -> SqliteResult<Vec<AgentPerformanceMetrics>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agent_performance_metrics ORDER BY reliability_score DESC, agent_key",
            METRICS_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], row_to_metrics)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}
