//! Matrix snapshot database operations

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{parse_date, parse_timestamp, Database};
use crate::models::MatrixSnapshot;

fn row_to_snapshot(row: &Row) -> SqliteResult<MatrixSnapshot> {
    let date: String = row.get(1)?;
    let data: String = row.get(4)?;
    let created_at: String = row.get(5)?;

    Ok(MatrixSnapshot {
        id: row.get(0)?,
        snapshot_date: parse_date(1, &date)?,
        total_apps: row.get(2)?,
        total_agents: row.get(3)?,
        matrix_data: serde_json::from_str(&data).unwrap_or(serde_json::Value::Null),
        created_at: parse_timestamp(5, &created_at)?,
    })
}

impl Database {
    /// Store the matrix for a day, replacing any snapshot already taken that day
    pub fn save_snapshot(
        &self,
        date: NaiveDate,
        total_apps: i64,
        total_agents: i64,
        matrix_data: &serde_json::Value,
    ) -> SqliteResult<MatrixSnapshot> {
        let mut conn = self.conn.lock().unwrap();
        let date_str = date.format("%Y-%m-%d").to_string();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM matrix_snapshots WHERE snapshot_date = ?1", [&date_str])?;
        tx.execute(
            "INSERT INTO matrix_snapshots (snapshot_date, total_apps, total_agents, matrix_data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                date_str,
                total_apps,
                total_agents,
                matrix_data.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        let id = tx.last_insert_rowid();
        let snapshot = tx.query_row(
            "SELECT id, snapshot_date, total_apps, total_agents, matrix_data, created_at
             FROM matrix_snapshots WHERE id = ?1",
            [id],
            row_to_snapshot,
        )?;
        tx.commit()?;

        Ok(snapshot)
    }

    pub fn latest_snapshot(&self) -> SqliteResult<Option<MatrixSnapshot>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, snapshot_date, total_apps, total_agents, matrix_data, created_at
             FROM matrix_snapshots ORDER BY snapshot_date DESC LIMIT 1",
            [],
            row_to_snapshot,
        )
        .optional()
    }

    pub fn count_snapshots(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM matrix_snapshots", [], |row| row.get(0))
    }
}
