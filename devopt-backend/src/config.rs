use std::env;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

const DEV_SESSION_SECRET: &str = "dev-secret-key-change-in-production";
const DEFAULT_COMMISSION_RATE: f64 = 0.30;

#[derive(Clone, Debug)]
pub struct Config {
    pub session_secret: String,
    pub port: u16,
    pub database_url: String,
    pub openai_api_key: Option<String>,
    pub openai_endpoint: Option<String>,
    pub openai_model: String,
    pub stripe_webhook_secret: Option<String>,
    pub github_token: Option<String>,
    pub github_username: Option<String>,
    pub commission_rate: f64,
    pub scheduler_enabled: bool,
    /// Password for the seeded admin account; random when unset
    pub admin_password: Option<String>,
    pub seed_sample_data: bool,
}

fn flag_set(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::config(format!("PORT must be a valid number, got '{}'", raw)))?,
            None => 5000,
        };

        let commission_rate = match non_empty("MARKETPLACE_COMMISSION_RATE") {
            Some(raw) => {
                let rate: f64 = raw.trim().parse().map_err(|_| {
                    AppError::config(format!("MARKETPLACE_COMMISSION_RATE must be a number, got '{}'", raw))
                })?;
                if !(0.0..=1.0).contains(&rate) {
                    return Err(AppError::config("MARKETPLACE_COMMISSION_RATE must be between 0 and 1"));
                }
                rate
            }
            None => DEFAULT_COMMISSION_RATE,
        };

        let session_secret = non_empty("SESSION_SECRET").unwrap_or_else(|| {
            log::warn!("SESSION_SECRET not set, using development default");
            DEV_SESSION_SECRET.to_string()
        });

        let scheduler_enabled = !flag_set(non_empty("DISABLE_SCHEDULER").as_deref());

        Ok(Self {
            session_secret,
            port,
            database_url: non_empty("DATABASE_URL").unwrap_or_else(|| "./.db/devopt.db".to_string()),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_endpoint: non_empty("OPENAI_ENDPOINT"),
            openai_model: non_empty("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            stripe_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            github_token: non_empty("GITHUB_TOKEN"),
            github_username: non_empty("GITHUB_USERNAME"),
            commission_rate,
            scheduler_enabled,
            admin_password: non_empty("ADMIN_PASSWORD"),
            seed_sample_data: flag_set(non_empty("SEED_SAMPLE_DATA").as_deref()),
        })
    }
}

/// Static catalog directory, looked up from the crate or the workspace root
pub fn find_config_dir() -> Option<PathBuf> {
    ["./config", "./devopt-backend/config", "../config"]
        .iter()
        .map(PathBuf::from)
        .find(|dir| dir.is_dir())
}

/// Parse `file_name` from `config_dir` when it exists there, otherwise the compiled-in copy.
/// A broken file on disk falls back to the built-in data.
pub fn load_ron_config<T: DeserializeOwned>(
    config_dir: Option<&Path>,
    file_name: &str,
    builtin: &str,
) -> AppResult<T> {
    if let Some(path) = config_dir.map(|dir| dir.join(file_name)).filter(|p| p.exists()) {
        match std::fs::read_to_string(&path) {
            Ok(content) => match ron::from_str::<T>(&content) {
                Ok(value) => {
                    log::info!("[config] Loaded {:?}", path);
                    return Ok(value);
                }
                Err(e) => log::error!("[config] Failed to parse {:?}: {}", path, e),
            },
            Err(e) => log::error!("[config] Failed to read {:?}: {}", path, e),
        }
    } else {
        log::debug!("[config] {} not found on disk, using built-in copy", file_name);
    }

    ron::from_str(builtin)
        .map_err(|e| AppError::config(format!("built-in {} is invalid: {}", file_name, e)))
}
