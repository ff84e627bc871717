//! AI agent inventory database operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{parse_json_list, parse_timestamp, Database};
use crate::models::{AgentType, AiAgent, NewAiAgent};

const AGENT_COLUMNS: &str = "a.id, a.app_id, a.agent_type, a.agent_name, a.model_name, a.role_description, \
                             a.usage_frequency, a.last_used, a.effectiveness_score, a.cost_estimate, \
                             a.features_used, a.api_endpoints, a.created_at, a.updated_at";

fn row_to_agent(row: &Row) -> SqliteResult<AiAgent> {
    let agent_type: String = row.get(2)?;
    let last_used: Option<String> = row.get(7)?;
    let features: String = row.get(10)?;
    let endpoints: String = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(AiAgent {
        id: row.get(0)?,
        app_id: row.get(1)?,
        agent_type: AgentType::from_str(&agent_type).unwrap_or(AgentType::Custom),
        agent_name: row.get(3)?,
        model_name: row.get(4)?,
        role_description: row.get(5)?,
        usage_frequency: row.get(6)?,
        last_used: last_used.map(|s| parse_timestamp(7, &s)).transpose()?,
        effectiveness_score: row.get(8)?,
        cost_estimate: row.get(9)?,
        features_used: parse_json_list(&features),
        api_endpoints: parse_json_list(&endpoints),
        created_at: parse_timestamp(12, &created_at)?,
        updated_at: parse_timestamp(13, &updated_at)?,
    })
}

impl Database {
    pub fn create_agent(&self, agent: &NewAiAgent) -> SqliteResult<AiAgent> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let features = serde_json::to_string(&agent.features_used).unwrap_or_else(|_| "[]".to_string());
        let endpoints = serde_json::to_string(&agent.api_endpoints).unwrap_or_else(|_| "[]".to_string());

        conn.execute(
            "INSERT INTO ai_agents (app_id, agent_type, agent_name, model_name, role_description,
                                    effectiveness_score, cost_estimate, features_used, api_endpoints,
                                    created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                agent.app_id,
                agent.agent_type.as_str(),
                agent.agent_name,
                agent.model_name,
                agent.role_description,
                agent.effectiveness_score,
                agent.cost_estimate,
                features,
                endpoints,
                now
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM ai_agents a WHERE a.id = ?1", AGENT_COLUMNS),
            [id],
            row_to_agent,
        )
    }

    pub fn get_agent(&self, id: i64) -> SqliteResult<Option<AiAgent>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM ai_agents a WHERE a.id = ?1", AGENT_COLUMNS),
            [id],
            row_to_agent,
        )
        .optional()
    }

    /// Agents belonging to active apps, optionally limited to one app
    pub fn list_active_agents(&self, app_id: Option<i64>) -> SqliteResult<Vec<AiAgent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ai_agents a
             JOIN replit_apps r ON r.id = a.app_id
             WHERE r.is_active = 1 AND (?1 IS NULL OR a.app_id = ?1)
             ORDER BY a.id",
            AGENT_COLUMNS
        ))?;
        let agents = stmt
            .query_map([app_id], row_to_agent)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(agents)
    }

    /// Agents of active apps ordered by usage, most used first
    pub fn top_agents_by_usage(&self, limit: usize) -> SqliteResult<Vec<AiAgent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ai_agents a
             JOIN replit_apps r ON r.id = a.app_id
             WHERE r.is_active = 1
             ORDER BY a.usage_frequency DESC, a.id
             LIMIT ?1",
            AGENT_COLUMNS
        ))?;
        let agents = stmt
            .query_map([limit as i64], row_to_agent)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(agents)
    }

    /// Bump usage counters for an agent
    pub fn record_agent_usage(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let rows = conn.execute(
            "UPDATE ai_agents SET usage_frequency = usage_frequency + 1, last_used = ?1, updated_at = ?1
             WHERE id = ?2",
            params![now, id],
        )?;
        Ok(rows > 0)
    }

    /// Count of agents created at or after `since`, regardless of app state
    pub fn count_agents_created_since(&self, since: DateTime<Utc>) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM ai_agents WHERE created_at >= ?1",
            [since.to_rfc3339()],
            |row| row.get(0),
        )
    }

    /// Agent count per type among active apps
    pub fn agent_distribution(&self) -> SqliteResult<Vec<(String, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT a.agent_type, COUNT(a.id) FROM ai_agents a
             JOIN replit_apps r ON r.id = a.app_id
             WHERE r.is_active = 1
             GROUP BY a.agent_type
             ORDER BY a.agent_type",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}
