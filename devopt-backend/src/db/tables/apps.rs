//! Tracked app database operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{parse_timestamp, Database};
use crate::models::{NewTrackedApp, TrackedApp};

const APP_COLUMNS: &str = "id, repl_id, name, url, language, description, file_count, size_kb, \
                           is_active, last_modified, created_at, updated_at";

fn row_to_app(row: &Row) -> SqliteResult<TrackedApp> {
    let last_modified: Option<String> = row.get(9)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(TrackedApp {
        id: row.get(0)?,
        repl_id: row.get(1)?,
        name: row.get(2)?,
        url: row.get(3)?,
        language: row.get(4)?,
        description: row.get(5)?,
        file_count: row.get(6)?,
        size_kb: row.get(7)?,
        is_active: row.get::<_, i64>(8)? != 0,
        last_modified: last_modified.map(|s| parse_timestamp(9, &s)).transpose()?,
        created_at: parse_timestamp(10, &created_at)?,
        updated_at: parse_timestamp(11, &updated_at)?,
    })
}

impl Database {
    /// Insert a tracked app, or refresh it when the repl_id is already known
    pub fn upsert_app(&self, app: &NewTrackedApp) -> SqliteResult<TrackedApp> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let last_modified = app.last_modified.map(|d| d.to_rfc3339());

        conn.execute(
            "INSERT INTO replit_apps (repl_id, name, url, language, description, file_count, size_kb,
                                      is_active, last_modified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?9)
             ON CONFLICT(repl_id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                language = excluded.language,
                description = excluded.description,
                file_count = excluded.file_count,
                size_kb = excluded.size_kb,
                last_modified = excluded.last_modified,
                is_active = 1,
                updated_at = excluded.updated_at",
            params![
                app.repl_id,
                app.name,
                app.url,
                app.language,
                app.description,
                app.file_count,
                app.size_kb,
                last_modified,
                now
            ],
        )?;

        conn.query_row(
            &format!("SELECT {} FROM replit_apps WHERE repl_id = ?1", APP_COLUMNS),
            [&app.repl_id],
            row_to_app,
        )
    }

    pub fn get_app(&self, id: i64) -> SqliteResult<Option<TrackedApp>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM replit_apps WHERE id = ?1", APP_COLUMNS),
            [id],
            row_to_app,
        )
        .optional()
    }

    /// List apps ordered by name
    pub fn list_apps(&self, active_only: bool) -> SqliteResult<Vec<TrackedApp>> {
        let conn = self.conn.lock().unwrap();
        let sql = if active_only {
            format!("SELECT {} FROM replit_apps WHERE is_active = 1 ORDER BY name, id", APP_COLUMNS)
        } else {
            format!("SELECT {} FROM replit_apps ORDER BY name, id", APP_COLUMNS)
        };

        let mut stmt = conn.prepare(&sql)?;
        let apps = stmt
            .query_map([], row_to_app)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(apps)
    }

    /// Mark an app inactive. Its agents drop out of every analytics view.
    pub fn deactivate_app(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE replit_apps SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(rows > 0)
    }

    pub fn count_active_apps(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM replit_apps WHERE is_active = 1",
            [],
            |row| row.get(0),
        )
    }
}
