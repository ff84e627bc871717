//! GitHub repository automation

pub mod templates;

use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub use templates::{generate_deployment_readme, generate_workflow, ReadmeProject};

const API_BASE: &str = "https://api.github.com";
const SERVICE: &str = "github";
pub const INTEGRATION_ID: &str = "github_integration";
pub const INTEGRATION_VERSION: &str = "2.0.0";

const FEATURES: &[&str] = &[
    "Repository Management",
    "CI/CD Automation",
    "Deployment Documentation",
];

static REPO_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("repository name pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRepository {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
}

impl CreateRepository {
    pub fn validate(&self) -> AppResult<()> {
        if !REPO_NAME_RE.is_match(&self.name) || self.name == "." || self.name == ".." {
            return Err(AppError::validation(format!(
                "'{}' is not a valid repository name",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStatus {
    pub integration_id: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub github_connected: bool,
    pub username: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub features: Vec<&'static str>,
}

pub fn integration_status(token_configured: bool, username: Option<&str>) -> IntegrationStatus {
    IntegrationStatus {
        integration_id: INTEGRATION_ID,
        version: INTEGRATION_VERSION,
        status: if token_configured { "active" } else { "not_configured" },
        github_connected: token_configured,
        username: username.map(str::to_string),
        last_updated: Utc::now(),
        features: FEATURES.to_vec(),
    }
}

#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
}

impl GithubClient {
    pub fn new(token: &str) -> AppResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| AppError::config(format!("Invalid GITHUB_TOKEN format: {}", e)))?;
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("devopt-backend/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::external(SERVICE, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
        })
    }

    /// Point the client at another API host (GitHub Enterprise)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a repository owned by the authenticated user
    pub async fn create_repository(&self, request: &CreateRepository) -> AppResult<Repository> {
        request.validate()?;

        let url = format!("{}/user/repos", self.api_base);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::external(SERVICE, format!("GitHub request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GithubErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or(body);
            log::error!("[GITHUB] Repository creation failed ({}): {}", status, message);
            return Err(AppError::external(
                SERVICE,
                format!("GitHub returned {}: {}", status, message),
            ));
        }

        let repository: Repository = response
            .json()
            .await
            .map_err(|e| AppError::external(SERVICE, format!("Unreadable GitHub response: {}", e)))?;
        log::info!("[GITHUB] Created repository {}", repository.full_name);
        Ok(repository)
    }
}
