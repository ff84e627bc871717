//! Tracked apps, their agents and credential records

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::controllers::{created, success};
use crate::error::{AppError, AppResult};
use crate::models::{NewAiAgent, NewAppCredential, NewTrackedApp};
use crate::AppState;

#[derive(Deserialize)]
pub struct AppListQuery {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Deserialize)]
pub struct AgentListQuery {
    app_id: Option<i64>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/apps")
            .route(web::get().to(list_apps))
            .route(web::post().to(register_app)),
    );
    cfg.service(web::resource("/api/apps/{id}").route(web::delete().to(deactivate_app)));
    cfg.service(web::resource("/api/apps/{id}/credentials").route(web::post().to(add_credential)));
    cfg.service(
        web::resource("/api/agents")
            .route(web::get().to(list_agents))
            .route(web::post().to(register_agent)),
    );
    cfg.service(web::resource("/api/agents/{id}/usage").route(web::post().to(record_usage)));
}

async fn list_apps(state: web::Data<AppState>, query: web::Query<AppListQuery>) -> AppResult<HttpResponse> {
    Ok(success(state.db.list_apps(!query.include_inactive)?))
}

async fn register_app(state: web::Data<AppState>, body: web::Json<NewTrackedApp>) -> AppResult<HttpResponse> {
    if body.repl_id.trim().is_empty() || body.name.trim().is_empty() {
        return Err(AppError::validation("repl_id and name are required"));
    }
    let app = state.db.upsert_app(&body)?;
    log::info!("Registered app {} ({})", app.id, app.name);
    Ok(created(app))
}

async fn deactivate_app(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if !state.db.deactivate_app(id)? {
        return Err(AppError::not_found(format!("App {}", id)));
    }
    Ok(success(serde_json::json!({ "id": id, "is_active": false })))
}

async fn add_credential(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<NewAppCredential>,
) -> AppResult<HttpResponse> {
    let app_id = path.into_inner();
    if body.service_name.trim().is_empty() || body.credential_type.trim().is_empty() {
        return Err(AppError::validation("service_name and credential_type are required"));
    }
    if state.db.get_app(app_id)?.is_none() {
        return Err(AppError::not_found(format!("App {}", app_id)));
    }
    Ok(created(state.db.add_credential(app_id, &body)?))
}

async fn list_agents(state: web::Data<AppState>, query: web::Query<AgentListQuery>) -> AppResult<HttpResponse> {
    Ok(success(state.db.list_active_agents(query.app_id)?))
}

async fn register_agent(state: web::Data<AppState>, body: web::Json<NewAiAgent>) -> AppResult<HttpResponse> {
    if body.agent_name.trim().is_empty() {
        return Err(AppError::validation("agent_name is required"));
    }
    if !(0.0..=1.0).contains(&body.effectiveness_score) {
        return Err(AppError::validation("effectiveness_score must be between 0 and 1"));
    }
    if !body.cost_estimate.is_finite() || body.cost_estimate < 0.0 {
        return Err(AppError::validation("cost_estimate must be zero or more"));
    }
    if state.db.get_app(body.app_id)?.is_none() {
        return Err(AppError::not_found(format!("App {}", body.app_id)));
    }
    Ok(created(state.db.create_agent(&body)?))
}

async fn record_usage(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if !state.db.record_agent_usage(id)? {
        return Err(AppError::not_found(format!("Agent {}", id)));
    }
    let agent = state
        .db
        .get_agent(id)?
        .ok_or_else(|| AppError::not_found(format!("Agent {}", id)))?;
    Ok(success(agent))
}
