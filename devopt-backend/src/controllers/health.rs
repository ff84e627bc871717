use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::analytics::LandingStats;
use crate::controllers::success;
use crate::error::AppResult;
use crate::models::MarketplaceStats;
use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct AgentTypeCount {
    agent_type: String,
    count: i64,
}

#[derive(Serialize)]
struct Overview {
    stats: LandingStats,
    agent_distribution: Vec<AgentTypeCount>,
    marketplace: MarketplaceStats,
    coordination_agents: usize,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/version").route(web::get().to(get_version)));
    cfg.service(web::resource("/api/overview").route(web::get().to(get_overview)));
}

async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let database = match state.db.count_active_apps() {
        Ok(_) => "connected",
        Err(e) => {
            log::error!("Health check database query failed: {}", e);
            "error"
        }
    };
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": VERSION,
        "database": database,
        "scheduler_running": state.scheduler.is_running(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "version": VERSION
    }))
}

async fn get_overview(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let agent_distribution = state
        .analytics
        .agent_distribution()?
        .into_iter()
        .map(|(agent_type, count)| AgentTypeCount { agent_type, count })
        .collect();

    Ok(success(Overview {
        stats: state.analytics.landing_stats()?,
        agent_distribution,
        marketplace: state.marketplace.stats()?,
        coordination_agents: state.coordination.registry().agents().len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_state;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_and_overview() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(config),
        )
        .await;

        let health: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["database"], "connected");

        let overview: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/overview").to_request()).await;
        assert_eq!(overview["success"], true);
        assert_eq!(overview["data"]["stats"]["estimated_savings"], "$2.4K");
        assert_eq!(overview["data"]["coordination_agents"], 5);
    }
}
