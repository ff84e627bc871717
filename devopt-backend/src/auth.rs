//! Marketplace accounts: registration, password checks and bearer sessions

use std::sync::Arc;

use chrono::Duration;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use serde::Deserialize;
use sha2::Sha256;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Session, SubscriptionTier, User, UserType};

const HASH_SCHEME: &str = "pbkdf2_sha256";
#[cfg(not(test))]
const PBKDF2_ROUNDS: u32 = 260_000;
#[cfg(test)]
const PBKDF2_ROUNDS: u32 = 1_000;
const HASH_LEN: usize = 32;
const SALT_LEN: usize = 16;
const SESSION_TOKEN_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;
const SESSION_TTL_HOURS: i64 = 24;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn derive_key(password: &str, salt: &str, rounds: u32) -> [u8; HASH_LEN] {
    let mut key = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), rounds, &mut key);
    key
}

/// PBKDF2-HMAC-SHA256 hash stored as `pbkdf2_sha256$<rounds>$<salt>$<hash>`
pub fn hash_password(password: &str) -> String {
    hash_password_with_rounds(password, PBKDF2_ROUNDS)
}

fn hash_password_with_rounds(password: &str, rounds: u32) -> String {
    let salt = random_hex(SALT_LEN);
    let key = derive_key(password, &salt, rounds);
    format!("{}${}${}${}", HASH_SCHEME, rounds, salt, hex::encode(key))
}

/// Check `password` against a stored hash. The round count is read from the
/// stored value, so hashes made with older settings keep verifying.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(4, '$');
    let (Some(HASH_SCHEME), Some(rounds), Some(salt), Some(digest)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    if rounds == 0 || expected.len() != HASH_LEN {
        return false;
    }
    let key = derive_key(password, salt, rounds);
    key.iter().zip(&expected).fold(0u8, |diff, (a, b)| diff | (a ^ b)) == 0
}

/// Random password for generated accounts
pub fn generate_password() -> String {
    random_hex(12)
}

/// Unique-constraint failures on insert mean a concurrent registration won the race
fn registration_error(err: rusqlite::Error) -> AppError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            AppError::Conflict("username or email is already registered".into())
        }
        other => other.into(),
    }
}

fn default_user_type() -> String {
    UserType::Enterprise.as_str().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default = "default_user_type")]
    pub user_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub struct AuthService {
    db: Arc<Database>,
    session_key: Vec<u8>,
}

impl AuthService {
    /// Session tokens are stored as an HMAC keyed by `session_secret`, so the
    /// table alone cannot be replayed as bearer tokens.
    pub fn new(db: Arc<Database>, session_secret: &str) -> Self {
        Self {
            db,
            session_key: session_secret.as_bytes().to_vec(),
        }
    }

    fn token_digest(&self, token: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.session_key).expect("HMAC accepts any key length");
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn register(&self, request: &RegisterRequest) -> AppResult<User> {
        let username = request.username.trim();
        let email = request.email.trim();

        if username.is_empty() {
            return Err(AppError::validation("username is required"));
        }
        if !EMAIL_RE.is_match(email) {
            return Err(AppError::validation("email address is invalid"));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let user_type = match UserType::from_str(&request.user_type) {
            Some(UserType::Admin) => {
                return Err(AppError::Forbidden("admin accounts cannot be self-registered".into()))
            }
            Some(t) => t,
            None => {
                return Err(AppError::validation(format!(
                    "user_type must be enterprise or developer, got '{}'",
                    request.user_type
                )))
            }
        };

        match self.db.user_identity_taken(username, email)? {
            (true, _) => return Err(AppError::Conflict("username is already taken".into())),
            (_, true) => return Err(AppError::Conflict("email is already registered".into())),
            _ => {}
        }

        let company = request.company_name.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let user = self
            .db
            .create_user(
                username,
                email,
                &hash_password(&request.password),
                company,
                user_type,
                SubscriptionTier::default(),
            )
            .map_err(registration_error)?;
        log::info!("[AUTH] Registered {} account '{}'", user.user_type.as_str(), user.username);
        Ok(user)
    }

    /// Check credentials and open a 24 hour session
    pub fn login(&self, request: &LoginRequest) -> AppResult<(Session, User)> {
        let invalid = || AppError::Unauthorized("invalid username or password".into());
        let user = self
            .db
            .get_user_by_username(request.username.trim())?
            .ok_or_else(invalid)?;
        if !user.is_active || !verify_password(&request.password, &user.password_hash) {
            return Err(invalid());
        }

        let token = random_hex(SESSION_TOKEN_LEN);
        let mut session = self.db.create_session(
            user.id,
            &self.token_digest(&token),
            Duration::hours(SESSION_TTL_HOURS),
        )?;
        session.token = token;
        log::info!("[AUTH] '{}' logged in", user.username);
        Ok((session, user))
    }

    pub fn logout(&self, token: &str) -> AppResult<bool> {
        Ok(self.db.delete_session(&self.token_digest(token))?)
    }

    /// The user behind a live session token
    pub fn current_user(&self, token: &str) -> AppResult<Option<User>> {
        let Some(session) = self.db.validate_session(&self.token_digest(token))? else {
            return Ok(None);
        };
        Ok(self.db.get_user(session.user_id)?.filter(|u| u.is_active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::memory_db;

    fn register_request(username: &str, email: &str, user_type: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "correct horse".into(),
            company_name: Some("  ".into()),
            user_type: user_type.into(),
        }
    }

    #[test]
    fn test_password_hashing() {
        let stored = hash_password("hunter2hunter2");
        assert!(verify_password("hunter2hunter2", &stored));
        assert!(!verify_password("hunter3hunter3", &stored));
        assert_ne!(stored, hash_password("hunter2hunter2"));
        assert!(stored.starts_with("pbkdf2_sha256$1000$"));
        assert!(!verify_password("x", "not-a-hash"));
        assert!(!verify_password("x", "salt$zz"));
        assert!(!verify_password("x", "pbkdf2_sha256$0$salt$00"));
    }

    #[test]
    fn test_stored_round_count_is_honoured() {
        let stored = hash_password_with_rounds("correct horse", 2_000);
        assert!(stored.starts_with("pbkdf2_sha256$2000$"));
        assert!(verify_password("correct horse", &stored));

        let tampered = stored.replacen("$2000$", "$1000$", 1);
        assert!(!verify_password("correct horse", &tampered));
    }

    #[test]
    fn test_duplicate_insert_is_conflict() {
        let db = memory_db();
        let insert = |email: &str| {
            db.create_user("grace", email, "x", None, UserType::Developer, SubscriptionTier::Starter)
        };
        insert("grace@example.com").unwrap();
        let err = registration_error(insert("other@example.com").unwrap_err());
        assert!(matches!(err, AppError::Conflict(_)));

        let other = registration_error(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(other, AppError::Database { .. }));
    }

    #[test]
    fn test_register_and_login() {
        let auth = AuthService::new(Arc::new(memory_db()), "test-secret");
        let user = auth
            .register(&register_request("ada", "ada@example.com", "developer"))
            .unwrap();
        assert_eq!(user.user_type, UserType::Developer);
        assert_eq!(user.subscription_tier, SubscriptionTier::Starter);
        assert!(user.company_name.is_none());

        let (session, logged_in) = auth
            .login(&LoginRequest {
                username: "ada".into(),
                password: "correct horse".into(),
            })
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(auth.current_user(&session.token).unwrap().unwrap().username, "ada");

        assert!(auth.logout(&session.token).unwrap());
        assert!(auth.current_user(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_session_tokens_stored_keyed() {
        let db = Arc::new(memory_db());
        let auth = AuthService::new(db.clone(), "secret-a");
        auth.register(&register_request("eve", "eve@example.com", "enterprise")).unwrap();
        let (session, _) = auth
            .login(&LoginRequest {
                username: "eve".into(),
                password: "correct horse".into(),
            })
            .unwrap();

        assert_eq!(session.token.len(), SESSION_TOKEN_LEN * 2);
        assert!(db.validate_session(&session.token).unwrap().is_none());
        assert!(auth.current_user(&session.token).unwrap().is_some());

        let rotated = AuthService::new(db, "secret-b");
        assert!(rotated.current_user(&session.token).unwrap().is_none());
    }

    #[test]
    fn test_register_validation() {
        let auth = AuthService::new(Arc::new(memory_db()), "test-secret");
        let mut short = register_request("bob", "bob@example.com", "enterprise");
        short.password = "short".into();
        assert!(matches!(auth.register(&short), Err(AppError::Validation(_))));
        assert!(matches!(
            auth.register(&register_request("bob", "not-an-email", "enterprise")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.register(&register_request("bob", "bob@example.com", "admin")),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            auth.register(&register_request("bob", "bob@example.com", "pirate")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_identity() {
        let auth = AuthService::new(Arc::new(memory_db()), "test-secret");
        auth.register(&register_request("cy", "cy@example.com", "enterprise")).unwrap();
        assert!(matches!(
            auth.register(&register_request("cy", "other@example.com", "enterprise")),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            auth.register(&register_request("cyd", "CY@example.com", "enterprise")),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let auth = AuthService::new(Arc::new(memory_db()), "test-secret");
        auth.register(&register_request("dee", "dee@example.com", "enterprise")).unwrap();
        let result = auth.login(&LoginRequest {
            username: "dee".into(),
            password: "wrong password".into(),
        });
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert!(auth
            .login(&LoginRequest {
                username: "nobody".into(),
                password: "whatever1".into(),
            })
            .is_err());
    }
}
