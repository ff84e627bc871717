use actix_web::HttpResponse;
use serde::Serialize;

pub mod analytics;
pub mod auth;
pub mod coordination;
pub mod deploy;
pub mod github;
pub mod health;
pub mod inventory;
pub mod marketplace;
pub mod payments;
pub mod scheduler;

/// `{"success": true, "data": ...}` with status 200
pub(crate) fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": data
    }))
}

/// Same envelope with status 201
pub(crate) fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": data
    }))
}

#[cfg(test)]
pub(crate) fn test_state() -> crate::AppState {
    use std::sync::Arc;

    let config = crate::config::Config::from_lookup(|key| match key {
        "STRIPE_WEBHOOK_SECRET" => Some("whsec_test".to_string()),
        _ => None,
    })
    .unwrap();
    crate::AppState::build(config, Arc::new(crate::db::fixtures::memory_db()), None).unwrap()
}
