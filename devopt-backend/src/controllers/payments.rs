use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::error::AppResult;
use crate::payments::{handle_webhook, WebhookOutcome};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/webhook/stripe").route(web::post().to(stripe_webhook)));
}

async fn stripe_webhook(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> AppResult<HttpResponse> {
    let signature = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok());

    let outcome = handle_webhook(
        &state.marketplace,
        state.config.stripe_webhook_secret.as_deref(),
        &body,
        signature,
        Utc::now().timestamp(),
    )?;

    Ok(match outcome {
        WebhookOutcome::Purchased(receipt) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "purchase_id": receipt.purchase.id,
            "license_key": receipt.purchase.license_key
        })),
        WebhookOutcome::Ignored(event_type) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "ignored": event_type
        })),
    })
}
