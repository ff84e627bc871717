pub mod ai;
pub mod analytics;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod coordination;
pub mod db;
pub mod deploy;
pub mod error;
pub mod executions;
pub mod github;
pub mod marketplace;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod scheduler;

use std::path::Path;
use std::sync::Arc;

use ai::OpenAIClient;
use analytics::AnalyticsService;
use auth::AuthService;
use config::Config;
use coordination::{AgentRegistry, CoordinationService, LlmExecutor};
use db::Database;
use error::{AppError, AppResult};
use executions::ExecutionTracker;
use github::GithubClient;
use marketplace::{MarketplaceCatalog, MarketplaceService};
use scheduler::{Scheduler, SchedulerConfig};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub auth: Arc<AuthService>,
    pub analytics: Arc<AnalyticsService>,
    pub marketplace: Arc<MarketplaceService>,
    pub coordination: Arc<CoordinationService>,
    pub execution_tracker: Arc<ExecutionTracker>,
    pub scheduler: Arc<Scheduler>,
    /// Present when GITHUB_TOKEN is set
    pub github: Option<GithubClient>,
}

impl AppState {
    /// Wire every service over one database. Catalog files are read from
    /// `config_dir` when given, else the built-in copies are used.
    pub fn build(config: Config, db: Arc<Database>, config_dir: Option<&Path>) -> AppResult<Self> {
        log::info!("Initializing execution tracker");
        let execution_tracker = Arc::new(ExecutionTracker::new(db.clone()));

        let analytics = Arc::new(AnalyticsService::new(db.clone()));
        let auth = Arc::new(AuthService::new(db.clone(), &config.session_secret));

        log::info!("Loading marketplace catalog");
        let catalog = MarketplaceCatalog::load(config_dir)?;
        let marketplace = Arc::new(MarketplaceService::new(db.clone(), config.commission_rate, catalog));

        log::info!("Loading coordination agent registry");
        let registry = AgentRegistry::load(config_dir)?;
        let llm = match config.openai_api_key.as_deref() {
            Some(key) => Some(
                OpenAIClient::new(key, config.openai_endpoint.as_deref(), Some(&config.openai_model))
                    .map_err(AppError::config)?,
            ),
            None => None,
        };
        let coordination = Arc::new(
            CoordinationService::new(registry, Arc::new(LlmExecutor::new(llm)))
                .with_tracker(execution_tracker.clone()),
        );

        let scheduler = Arc::new(Scheduler::new(
            db.clone(),
            analytics.clone(),
            execution_tracker.clone(),
            SchedulerConfig::default(),
        )?);

        let github = config.github_token.as_deref().map(GithubClient::new).transpose()?;

        Ok(Self {
            db,
            config,
            auth,
            analytics,
            marketplace,
            coordination,
            execution_tracker,
            scheduler,
            github,
        })
    }
}
