use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::controllers::success;
use crate::coordination::CoordinationRequest;
use crate::error::AppResult;
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Deserialize)]
pub struct HistoryQuery {
    agent_key: Option<String>,
    limit: Option<usize>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/coordination")
            .route("/request", web::post().to(coordinate))
            .route("/status", web::get().to(status))
            .route("/health", web::get().to(health)),
    );
    cfg.service(web::resource("/api/agents-performance").route(web::get().to(agents_performance)));
    cfg.service(web::resource("/api/agents-performance/{agent_key}").route(web::get().to(agent_performance)));
    cfg.service(web::resource("/api/execution-history").route(web::get().to(execution_history)));
}

async fn coordinate(state: web::Data<AppState>, body: web::Json<CoordinationRequest>) -> AppResult<HttpResponse> {
    let response = state.coordination.coordinate(body.into_inner()).await?;
    Ok(success(response))
}

async fn status(state: web::Data<AppState>) -> HttpResponse {
    success(state.coordination.status())
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    success(state.coordination.health())
}

async fn agents_performance(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.execution_tracker.performance()?))
}

async fn agent_performance(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    Ok(success(state.execution_tracker.agent_performance(&path)?))
}

async fn execution_history(state: web::Data<AppState>, query: web::Query<HistoryQuery>) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
    Ok(success(
        state
            .execution_tracker
            .history(query.agent_key.as_deref(), limit)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_state;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_request_without_llm_records_failures() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/coordination/request")
            .set_json(json!({"request_type": "financial", "description": "Assess Q3 spend"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["overall_confidence"], 0.0);
        let contributions = body["data"]["agent_contributions"].as_array().unwrap();
        assert!(!contributions.is_empty());
        assert!(contributions.iter().all(|c| c["success"] == false));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/execution-history?limit=10").to_request(),
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), contributions.len());

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/coordination/status").to_request())
                .await;
        assert_eq!(body["data"]["metrics"]["total_requests"], 1);

        let agent_key = contributions[0]["agent_key"].as_str().unwrap();
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/agents-performance/{}", agent_key))
                .to_request(),
        )
        .await;
        assert_eq!(body["data"]["agent_key"], agent_key);
        assert_eq!(body["data"]["successful_executions"], 0);

        let req = test::TestRequest::get().uri("/api/agents-performance/nobody").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_invalid_priority_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(config),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/coordination/request")
            .set_json(json!({"request_type": "strategic", "description": "Plan", "priority": 11}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
