use std::str::FromStr;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::controllers::success;
use crate::deploy::{DeployGuide, Platform};
use crate::error::{AppError, AppResult};

#[derive(Deserialize)]
pub struct GuideQuery {
    platform: Option<String>,
}

#[derive(Serialize)]
struct PlatformInfo {
    slug: &'static str,
    name: &'static str,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/deploy/guide").route(web::get().to(deploy_guide)));
    cfg.service(web::resource("/api/deploy/platforms").route(web::get().to(platforms)));
}

/// Parse a platform name, rejecting unknown hosts with 400
pub(crate) fn parse_platform(raw: &str) -> AppResult<Platform> {
    Platform::from_str(raw.trim())
        .map_err(|_| AppError::validation(format!("unknown deployment platform '{}'", raw)))
}

async fn deploy_guide(query: web::Query<GuideQuery>) -> AppResult<HttpResponse> {
    let platform = match query.platform.as_deref() {
        Some(raw) => parse_platform(raw)?,
        None => Platform::default(),
    };
    Ok(success(DeployGuide::for_platform(platform)))
}

async fn platforms() -> HttpResponse {
    success(
        Platform::all()
            .into_iter()
            .map(|p| PlatformInfo {
                slug: p.slug(),
                name: p.display_name(),
            })
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_guide_per_platform() {
        let app = test::init_service(App::new().configure(config)).await;

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/deploy/guide").to_request()).await;
        assert_eq!(body["data"]["platform_name"], "AWS App Runner");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/deploy/guide?platform=heroku").to_request(),
        )
        .await;
        assert_eq!(body["data"]["platform"], "heroku");

        let req = test::TestRequest::get().uri("/api/deploy/guide?platform=mars").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/deploy/platforms").to_request())
                .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
    }
}
