//! Marketplace user accounts

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

use crate::db::{parse_timestamp, Database};
use crate::models::{SubscriptionTier, User, UserType};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, company_name, user_type, subscription_tier, is_active, created_at";

fn row_to_user(row: &Row) -> SqliteResult<User> {
    let user_type: String = row.get(5)?;
    let tier: String = row.get(6)?;
    let created_at: String = row.get(8)?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        company_name: row.get(4)?,
        user_type: UserType::from_str(&user_type).unwrap_or(UserType::Enterprise),
        subscription_tier: SubscriptionTier::from_str(&tier).unwrap_or_default(),
        is_active: row.get::<_, i64>(7)? != 0,
        created_at: parse_timestamp(8, &created_at)?,
    })
}

impl Database {
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        company_name: Option<&str>,
        user_type: UserType,
        subscription_tier: SubscriptionTier,
    ) -> SqliteResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, company_name, user_type, subscription_tier,
                                is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
            params![
                username,
                email,
                password_hash,
                company_name,
                user_type.as_str(),
                subscription_tier.as_str(),
                Utc::now().to_rfc3339()
            ],
        )?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            row_to_user,
        )
    }

    pub fn get_user(&self, id: i64) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            row_to_user,
        )
        .optional()
    }

    pub fn get_user_by_username(&self, username: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            [username],
            row_to_user,
        )
        .optional()
    }

    /// Whether the username and the email (case-insensitive) are already registered
    pub fn user_identity_taken(&self, username: &str, email: &str) -> SqliteResult<(bool, bool)> {
        let conn = self.conn.lock().unwrap();
        let username_taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            [username],
            |row| row.get(0),
        )?;
        let email_taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE lower(email) = lower(?1)",
            [email],
            |row| row.get(0),
        )?;
        Ok((username_taken > 0, email_taken > 0))
    }

    pub fn count_users(&self) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
    }

    pub fn count_users_by_type(&self, user_type: UserType) -> SqliteResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE user_type = ?1 AND is_active = 1",
            [user_type.as_str()],
            |row| row.get(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::db::fixtures::{memory_db, new_user};
    use crate::models::{SubscriptionTier, UserType};

    #[test]
    fn test_create_and_lookup() {
        let db = memory_db();
        let user = new_user(&db, "dev", UserType::Developer);
        assert_eq!(user.subscription_tier, SubscriptionTier::Starter);

        let by_name = db.get_user_by_username("dev").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(db.get_user(user.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_identity_checks() {
        let db = memory_db();
        new_user(&db, "dev", UserType::Developer);
        assert_eq!(db.user_identity_taken("dev", "x@example.com").unwrap(), (true, false));
        assert_eq!(db.user_identity_taken("other", "DEV@example.com").unwrap(), (false, true));
        assert!(db
            .create_user("dev", "new@example.com", "h", None, UserType::Enterprise, SubscriptionTier::Starter)
            .is_err());
    }

    #[test]
    fn test_count_by_type() {
        let db = memory_db();
        new_user(&db, "a", UserType::Developer);
        new_user(&db, "b", UserType::Developer);
        new_user(&db, "c", UserType::Enterprise);
        assert_eq!(db.count_users().unwrap(), 3);
        assert_eq!(db.count_users_by_type(UserType::Developer).unwrap(), 2);
        assert_eq!(db.count_users_by_type(UserType::Admin).unwrap(), 0);
    }
}
