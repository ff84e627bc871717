//! SQLite database - schema definitions and connection management
//!
//! This file contains:
//! - Database struct definition
//! - Connection management (new, init)
//! - Schema creation and migrations
//! - Row conversion helpers shared by the table modules
//!
//! All database operations are in the tables/ subdirectory.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::Mutex;

/// Main database wrapper with connection pooling via Mutex
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection and initialize schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(database_url)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Initialize all database tables and run migrations
    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Tracked applications
        conn.execute(
            "CREATE TABLE IF NOT EXISTS replit_apps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repl_id TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                url TEXT,
                language TEXT,
                description TEXT,
                file_count INTEGER NOT NULL DEFAULT 0,
                size_kb REAL NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Migration: last_modified was added after the first release
        let _ = conn.execute("ALTER TABLE replit_apps ADD COLUMN last_modified TEXT", []);

        // AI agents detected inside tracked apps
        conn.execute(
            "CREATE TABLE IF NOT EXISTS ai_agents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_id INTEGER NOT NULL REFERENCES replit_apps(id) ON DELETE CASCADE,
                agent_type TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                model_name TEXT,
                role_description TEXT,
                usage_frequency INTEGER NOT NULL DEFAULT 0,
                last_used TEXT,
                effectiveness_score REAL NOT NULL DEFAULT 0,
                cost_estimate REAL NOT NULL DEFAULT 0,
                features_used TEXT NOT NULL DEFAULT '[]',
                api_endpoints TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_ai_agents_app ON ai_agents(app_id)",
            [],
        )?;

        // Which services an app holds credentials for (never the secret itself)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS app_credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                app_id INTEGER NOT NULL REFERENCES replit_apps(id) ON DELETE CASCADE,
                credential_type TEXT NOT NULL,
                service_name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // One matrix snapshot per day
        conn.execute(
            "CREATE TABLE IF NOT EXISTS matrix_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                snapshot_date TEXT UNIQUE NOT NULL,
                total_apps INTEGER NOT NULL,
                total_agents INTEGER NOT NULL,
                matrix_data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Coordination agent runs
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_executions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                execution_id TEXT UNIQUE NOT NULL,
                agent_key TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                input_data TEXT NOT NULL,
                output_data TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                execution_time_ms INTEGER,
                tokens_used INTEGER NOT NULL DEFAULT 0,
                cost_usd REAL NOT NULL DEFAULT 0,
                error_message TEXT,
                started_at TEXT NOT NULL,
                completed_at TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_agent_executions_key ON agent_executions(agent_key, started_at)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_performance_metrics (
                agent_key TEXT PRIMARY KEY,
                agent_name TEXT NOT NULL,
                total_executions INTEGER NOT NULL DEFAULT 0,
                successful_executions INTEGER NOT NULL DEFAULT 0,
                failed_executions INTEGER NOT NULL DEFAULT 0,
                success_rate REAL NOT NULL DEFAULT 0,
                avg_execution_time_ms REAL NOT NULL DEFAULT 0,
                min_execution_time_ms INTEGER,
                max_execution_time_ms INTEGER,
                reliability_score REAL NOT NULL DEFAULT 0,
                efficiency_score REAL NOT NULL DEFAULT 0,
                total_cost_usd REAL NOT NULL DEFAULT 0,
                avg_cost_per_execution REAL NOT NULL DEFAULT 0,
                cost_efficiency_rating TEXT NOT NULL DEFAULT 'average',
                peak_usage_hour INTEGER,
                recommended_concurrency INTEGER NOT NULL DEFAULT 1,
                last_execution TEXT,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Messages produced by scheduled jobs
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                sent INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS system_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Marketplace accounts
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                company_name TEXT,
                user_type TEXT NOT NULL DEFAULT 'enterprise',
                subscription_tier TEXT NOT NULL DEFAULT 'starter',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT UNIQUE NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS marketplace_agents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                industry TEXT NOT NULL,
                pricing_model TEXT NOT NULL,
                price REAL NOT NULL,
                version TEXT NOT NULL DEFAULT '1.0.0',
                developer_id INTEGER NOT NULL REFERENCES users(id),
                is_active INTEGER NOT NULL DEFAULT 1,
                is_verified INTEGER NOT NULL DEFAULT 0,
                download_count INTEGER NOT NULL DEFAULT 0,
                rating REAL NOT NULL DEFAULT 0,
                revenue REAL NOT NULL DEFAULT 0,
                tech_stack TEXT NOT NULL DEFAULT '[]',
                compliance_standards TEXT NOT NULL DEFAULT '[]',
                security_features TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS purchases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                buyer_id INTEGER NOT NULL REFERENCES users(id),
                agent_id INTEGER NOT NULL REFERENCES marketplace_agents(id),
                amount_paid REAL NOT NULL,
                license_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                payment_reference TEXT,
                license_key TEXT UNIQUE NOT NULL,
                purchased_at TEXT NOT NULL
            )",
            [],
        )?;

        // Webhooks are redelivered; one purchase per payment
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_purchases_payment_reference
             ON purchases(payment_reference) WHERE payment_reference IS NOT NULL",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reviewer_id INTEGER NOT NULL REFERENCES users(id),
                agent_id INTEGER NOT NULL REFERENCES marketplace_agents(id),
                rating INTEGER NOT NULL,
                title TEXT,
                comment TEXT,
                is_verified_purchase INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Per listing per day counters
        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_analytics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id INTEGER NOT NULL REFERENCES marketplace_agents(id),
                date TEXT NOT NULL,
                views INTEGER NOT NULL DEFAULT 0,
                downloads INTEGER NOT NULL DEFAULT 0,
                revenue REAL NOT NULL DEFAULT 0,
                UNIQUE(agent_id, date)
            )",
            [],
        )?;

        Ok(())
    }
}

/// Parse an RFC 3339 column into UTC, reporting bad data as a conversion error
pub(crate) fn parse_timestamp(idx: usize, value: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a `YYYY-MM-DD` column
pub(crate) fn parse_date(idx: usize, value: &str) -> SqliteResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// JSON string arrays stored in TEXT columns. Malformed data reads as empty.
pub(crate) fn parse_json_list(value: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_schema() {
        let db = Database::new(":memory:").unwrap();
        let conn = db.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('replit_apps', 'ai_agents', 'marketplace_agents', 'agent_executions', 'users')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("devopt.db");
        let path = path.to_str().unwrap();
        Database::new(path).unwrap();
        // Second open runs the migrations again without failing
        Database::new(path).unwrap();
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_timestamp(0, "2024-05-01T10:00:00+00:00").is_ok());
        assert!(parse_timestamp(0, "yesterday").is_err());
        assert_eq!(parse_date(0, "2024-05-01").unwrap().to_string(), "2024-05-01");
        assert_eq!(parse_json_list("[\"a\",\"b\"]"), vec!["a", "b"]);
        assert!(parse_json_list("not json").is_empty());
    }
}
