use actix_web::{web, HttpResponse};

use crate::controllers::success;
use crate::error::AppResult;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/scheduler/status").route(web::get().to(scheduler_status)));
}

async fn scheduler_status(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.scheduler.status()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::test_state;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_status_lists_jobs() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(config),
        )
        .await;
        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/scheduler/status").to_request())
                .await;
        assert_eq!(body["data"]["running"], false);
        assert_eq!(body["data"]["jobs"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"]["jobs"][3]["schedule"], "0 0 9 * * Sun");
    }
}
