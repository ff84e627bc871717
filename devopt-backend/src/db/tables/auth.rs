//! Bearer session database operations

use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension, Result as SqliteResult};

use crate::db::{parse_timestamp, Database};
use crate::models::Session;

impl Database {
    /// Store a session token for a user that expires after `ttl`
    pub fn create_session(&self, user_id: i64, token: &str, ttl: Duration) -> SqliteResult<Session> {
        let conn = self.conn.lock().unwrap();
        let created_at = Utc::now();
        let expires_at = created_at + ttl;

        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![token, user_id, created_at.to_rfc3339(), expires_at.to_rfc3339()],
        )?;

        Ok(Session {
            id: conn.last_insert_rowid(),
            token: token.to_string(),
            user_id,
            created_at,
            expires_at,
        })
    }

    /// Look up a session, returning None when it is missing or expired
    pub fn validate_session(&self, token: &str) -> SqliteResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        let session = conn
            .query_row(
                "SELECT id, token, user_id, created_at, expires_at FROM auth_sessions WHERE token = ?1",
                [token],
                |row| {
                    let created_at: String = row.get(3)?;
                    let expires_at: String = row.get(4)?;
                    Ok(Session {
                        id: row.get(0)?,
                        token: row.get(1)?,
                        user_id: row.get(2)?,
                        created_at: parse_timestamp(3, &created_at)?,
                        expires_at: parse_timestamp(4, &expires_at)?,
                    })
                },
            )
            .optional()?;

        Ok(session.filter(|s| s.expires_at > Utc::now()))
    }

    pub fn delete_session(&self, token: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
        Ok(rows > 0)
    }

    pub fn delete_expired_sessions(&self) -> SqliteResult<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM auth_sessions WHERE expires_at < ?1",
            [Utc::now().to_rfc3339()],
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::{memory_db, new_user};
    use crate::models::UserType;
    use chrono::Duration;

    #[test]
    fn test_session_round_trip() {
        let db = memory_db();
        let user = new_user(&db, "dev", UserType::Developer);
        let session = db.create_session(user.id, "tok-live", Duration::hours(24)).unwrap();

        let found = db.validate_session(&session.token).unwrap().unwrap();
        assert_eq!(found.user_id, user.id);

        assert!(db.delete_session(&session.token).unwrap());
        assert!(db.validate_session(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_expired_session_rejected_and_cleaned() {
        let db = memory_db();
        let user = new_user(&db, "dev", UserType::Developer);
        let session = db.create_session(user.id, "tok-stale", Duration::seconds(-5)).unwrap();
        assert!(db.validate_session(&session.token).unwrap().is_none());
        assert_eq!(db.delete_expired_sessions().unwrap(), 1);
    }
}
