use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::controllers::{created, success};
use crate::error::{AppError, AppResult};
use crate::AppState;

const DEFAULT_NOTIFICATION_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    unsent: bool,
    limit: Option<usize>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/matrix-data").route(web::get().to(matrix_data)));
    cfg.service(web::resource("/api/matrix/snapshot").route(web::post().to(save_snapshot)));
    cfg.service(
        web::resource("/api/optimization-recommendations").route(web::get().to(optimization_recommendations)),
    );
    cfg.service(web::resource("/api/weekly-summary").route(web::get().to(weekly_summary)));
    cfg.service(web::resource("/api/analytics/report").route(web::get().to(analytics_report)));
    cfg.service(web::resource("/api/notifications").route(web::get().to(list_notifications)));
    cfg.service(web::resource("/api/notifications/{id}/sent").route(web::post().to(mark_sent)));
}

async fn matrix_data(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.analytics.generate_matrix()?))
}

async fn save_snapshot(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let (snapshot, _) = state.analytics.save_daily_snapshot(Utc::now().date_naive())?;
    Ok(created(snapshot))
}

async fn optimization_recommendations(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.analytics.optimization_recommendations()?))
}

async fn weekly_summary(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.analytics.weekly_summary(Utc::now().date_naive())?))
}

async fn analytics_report(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.analytics.analytics_report()?))
}

async fn list_notifications(
    state: web::Data<AppState>,
    query: web::Query<NotificationQuery>,
) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT).min(500);
    Ok(success(state.db.list_notifications(query.unsent, limit)?))
}

/// Acknowledge delivery of a queued notification
async fn mark_sent(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if !state.db.mark_notification_sent(id)? {
        return Err(AppError::not_found(format!("Notification {}", id)));
    }
    Ok(success(serde_json::json!({ "id": id, "sent": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_state;
    use crate::db::fixtures::{new_agent, new_app};
    use crate::models::{AgentType, NotificationKind};
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_matrix_and_snapshot() {
        let state = test_state();
        let app_row = state.db.upsert_app(&new_app("r1", "Alpha", "rust")).unwrap();
        state
            .db
            .create_agent(&new_agent(app_row.id, AgentType::Anthropic, "planner"))
            .unwrap();

        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let matrix: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/matrix-data").to_request()).await;
        assert_eq!(matrix["data"]["total_apps"], 1);
        assert_eq!(matrix["data"]["relationships"].as_array().unwrap().len(), 1);

        let resp = test::call_service(&app, test::TestRequest::post().uri("/api/matrix/snapshot").to_request()).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

        let report: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/analytics/report").to_request())
                .await;
        assert_eq!(report["success"], true);
    }

    #[actix_web::test]
    async fn test_notification_acknowledged() {
        let state = test_state();
        let id = state
            .db
            .queue_notification(NotificationKind::OptimizationTip, "Consolidate planners")
            .unwrap();
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/notifications/{}/sent", id))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let pending: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/notifications?unsent=true").to_request(),
        )
        .await;
        assert!(pending["data"].as_array().unwrap().is_empty());

        let req = test::TestRequest::post().uri("/api/notifications/999/sent").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
