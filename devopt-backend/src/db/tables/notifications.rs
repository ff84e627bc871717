//! Notification queue and key/value system settings

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Result as SqliteResult};

use crate::db::{parse_timestamp, Database};
use crate::models::{Notification, NotificationKind};

impl Database {
    pub fn queue_notification(&self, kind: NotificationKind, message: &str) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO notifications (kind, message, sent, created_at) VALUES (?1, ?2, 0, ?3)",
            params![kind.as_str(), message, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Newest first
    pub fn list_notifications(&self, unsent_only: bool, limit: usize) -> SqliteResult<Vec<Notification>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, kind, message, sent, created_at FROM notifications
             WHERE (?1 = 0 OR sent = 0)
             ORDER BY id DESC
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![unsent_only as i64, limit as i64], |row| {
                let kind: String = row.get(1)?;
                let created_at: String = row.get(4)?;
                Ok(Notification {
                    id: row.get(0)?,
                    kind: NotificationKind::from_str(&kind).unwrap_or(NotificationKind::DailySummary),
                    message: row.get(2)?,
                    sent: row.get::<_, i64>(3)? != 0,
                    created_at: parse_timestamp(4, &created_at)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn mark_notification_sent(&self, id: i64) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("UPDATE notifications SET sent = 1 WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn get_setting(&self, key: &str) -> SqliteResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM system_settings WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
    }

    pub fn set_setting(&self, key: &str, value: &str, description: Option<&str>) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO system_settings (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                description = COALESCE(excluded.description, system_settings.description),
                updated_at = excluded.updated_at",
            params![key, value, description, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::memory_db;
    use crate::models::NotificationKind;

    #[test]
    fn test_notification_queue() {
        let db = memory_db();
        let first = db.queue_notification(NotificationKind::DailySummary, "daily").unwrap();
        db.queue_notification(NotificationKind::OptimizationTip, "tip").unwrap();

        assert!(db.mark_notification_sent(first).unwrap());
        let unsent = db.list_notifications(true, 10).unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].kind, NotificationKind::OptimizationTip);
        assert_eq!(db.list_notifications(false, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_settings_upsert() {
        let db = memory_db();
        assert!(db.get_setting("k").unwrap().is_none());
        db.set_setting("k", "1", Some("a key")).unwrap();
        db.set_setting("k", "2", None).unwrap();
        assert_eq!(db.get_setting("k").unwrap().as_deref(), Some("2"));
    }
}
