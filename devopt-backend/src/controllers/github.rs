use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::controllers::deploy::parse_platform;
use crate::controllers::{created, success};
use crate::error::{AppError, AppResult};
use crate::github::{self, CreateRepository, ReadmeProject};
use crate::AppState;

#[derive(Deserialize)]
pub struct WorkflowRequest {
    #[serde(default)]
    targets: Vec<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/github")
            .route("/readme", web::post().to(generate_readme))
            .route("/workflow", web::post().to(generate_workflow))
            .route("/repository", web::post().to(create_repository))
            .route("/status", web::get().to(status)),
    );
}

async fn generate_readme(state: web::Data<AppState>, body: web::Json<ReadmeProject>) -> HttpResponse {
    let mut project = body.into_inner();
    if project.owner.is_none() {
        project.owner = state.config.github_username.clone();
    }
    success(serde_json::json!({
        "readme": github::generate_deployment_readme(&project)
    }))
}

async fn generate_workflow(body: web::Json<WorkflowRequest>) -> AppResult<HttpResponse> {
    let targets = body
        .targets
        .iter()
        .map(|raw| parse_platform(raw))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(success(serde_json::json!({
        "targets": targets,
        "workflow": github::generate_workflow(&targets)
    })))
}

async fn create_repository(
    state: web::Data<AppState>,
    body: web::Json<CreateRepository>,
) -> AppResult<HttpResponse> {
    let client = state
        .github
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("GITHUB_TOKEN is not configured".into()))?;
    Ok(created(client.create_repository(&body).await?))
}

async fn status(state: web::Data<AppState>) -> HttpResponse {
    success(github::integration_status(
        state.github.is_some(),
        state.config.github_username.as_deref(),
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
    async fn test_generators_and_unconfigured_client() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/github/readme")
            .set_json(json!({"name": "Agent Hub"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"]["readme"].as_str().unwrap().starts_with("# Agent Hub"));

        let req = test::TestRequest::post()
            .uri("/api/github/workflow")
            .set_json(json!({"targets": ["gcp", "heroku"]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"]["workflow"].as_str().unwrap().contains("deploy-heroku:"));

        let req = test::TestRequest::post()
            .uri("/api/github/workflow")
            .set_json(json!({"targets": ["moon"]}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/github/repository")
            .set_json(json!({"name": "agent-hub"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/github/status").to_request()).await;
        assert_eq!(body["data"]["github_connected"], false);
    }
}
