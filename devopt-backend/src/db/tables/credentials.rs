//! App credential inventory (service names only)

use chrono::Utc;
use rusqlite::{params, Result as SqliteResult};

use crate::db::{parse_timestamp, Database};
use crate::models::{AppCredential, NewAppCredential};

impl Database {
    pub fn add_credential(&self, app_id: i64, credential: &NewAppCredential) -> SqliteResult<AppCredential> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO app_credentials (app_id, credential_type, service_name, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![app_id, credential.credential_type, credential.service_name, now.to_rfc3339()],
        )?;

        Ok(AppCredential {
            id: conn.last_insert_rowid(),
            app_id,
            credential_type: credential.credential_type.clone(),
            service_name: credential.service_name.clone(),
            is_active: true,
            created_at: now,
        })
    }

    /// Active credentials held by active apps
    pub fn list_active_credentials(&self) -> SqliteResult<Vec<AppCredential>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.app_id, c.credential_type, c.service_name, c.is_active, c.created_at
             FROM app_credentials c
             JOIN replit_apps r ON r.id = c.app_id
             WHERE r.is_active = 1 AND c.is_active = 1
             ORDER BY c.id",
        )?;

        let credentials = stmt
            .query_map([], |row| {
                let created_at: String = row.get(5)?;
                Ok(AppCredential {
                    id: row.get(0)?,
                    app_id: row.get(1)?,
                    credential_type: row.get(2)?,
                    service_name: row.get(3)?,
                    is_active: row.get::<_, i64>(4)? != 0,
                    created_at: parse_timestamp(5, &created_at)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::{memory_db, new_app};
    use crate::models::NewAppCredential;

    #[test]
    fn test_credentials_follow_app_state() {
        let db = memory_db();
        let a = db.upsert_app(&new_app("r1", "Alpha", "python")).unwrap();
        let b = db.upsert_app(&new_app("r2", "Beta", "python")).unwrap();
        let cred = NewAppCredential {
            credential_type: "api_key".into(),
            service_name: "stripe".into(),
        };
        db.add_credential(a.id, &cred).unwrap();
        db.add_credential(b.id, &cred).unwrap();
        assert_eq!(db.list_active_credentials().unwrap().len(), 2);

        db.deactivate_app(b.id).unwrap();
        let remaining = db.list_active_credentials().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].app_id, a.id);
    }

    #[test]
    fn test_unknown_app_rejected_by_foreign_key() {
        let db = memory_db();
        let cred = NewAppCredential {
            credential_type: "api_key".into(),
            service_name: "openai".into(),
        };
        assert!(db.add_credential(404, &cred).is_err());
    }
}
