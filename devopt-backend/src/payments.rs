//! Stripe-compatible payment webhooks
//!
//! The `Stripe-Signature` header looks like `t=1700000000,v1=<hex>,v1=<hex>`.
//! Each `v1` is an HMAC-SHA256 of `"<t>.<raw body>"` keyed with the webhook
//! secret; any one matching within the tolerance window is accepted.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::{AppError, AppResult};
use crate::marketplace::{MarketplaceService, PurchaseReceipt};

type HmacSha256 = Hmac<Sha256>;

/// Seconds a signed timestamp may differ from the current time
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

fn signed_digest(secret: &str, timestamp: &str, payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Signature header for a payload, as the payment provider would send it
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let digest = signed_digest(secret, &timestamp.to_string(), payload).finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(digest))
}

/// Check a signature header against the raw payload at time `now` (unix seconds)
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now: i64) -> AppResult<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| AppError::validation("signature header has no timestamp"))?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| AppError::validation("signature timestamp is not a number"))?;
    if (now - signed_at).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(AppError::validation("signature timestamp outside the tolerance window"));
    }
    if signatures.is_empty() {
        return Err(AppError::validation("signature header has no v1 signature"));
    }

    let matched = signatures.iter().any(|signature| {
        hex::decode(signature)
            .map(|expected| {
                signed_digest(secret, timestamp, payload)
                    .verify_slice(&expected)
                    .is_ok()
            })
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(AppError::validation("signature does not match payload"))
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug)]
pub enum WebhookOutcome {
    Purchased(PurchaseReceipt),
    Ignored(String),
}

fn metadata_id(object: &Value, key: &str) -> AppResult<i64> {
    let value = object
        .get("metadata")
        .and_then(|m| m.get(key))
        .ok_or_else(|| AppError::validation(format!("payment metadata is missing {}", key)))?;
    // Metadata values arrive as strings
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| AppError::validation(format!("payment metadata {} is not an id", key)))
}

/// Verify and apply a webhook delivery
pub fn handle_webhook(
    marketplace: &MarketplaceService,
    secret: Option<&str>,
    payload: &[u8],
    signature: Option<&str>,
    now: i64,
) -> AppResult<WebhookOutcome> {
    let secret = secret.ok_or_else(|| AppError::Unavailable("payment webhooks are not configured".into()))?;
    let signature = signature.ok_or_else(|| AppError::validation("missing Stripe-Signature header"))?;
    verify_signature(payload, signature, secret, now)?;

    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| AppError::validation(format!("malformed webhook payload: {}", e)))?;

    if event.event_type != PAYMENT_SUCCEEDED {
        log::debug!("[PAYMENTS] Ignoring {} event", event.event_type);
        return Ok(WebhookOutcome::Ignored(event.event_type));
    }

    let object = &event.data.object;
    let buyer_id = metadata_id(object, "buyer_id")?;
    let agent_id = metadata_id(object, "agent_id")?;
    let payment_id = object.get("id").and_then(Value::as_str);

    let receipt = marketplace.process_purchase(buyer_id, agent_id, payment_id)?;
    log::info!(
        "[PAYMENTS] Payment {} completed purchase {}",
        payment_id.unwrap_or("<unknown>"),
        receipt.purchase.id
    );
    Ok(WebhookOutcome::Purchased(receipt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use crate::db::fixtures::{memory_db, new_listing, new_user};
    use crate::marketplace::MarketplaceCatalog;
    use crate::models::UserType;
    use serde_json::json;
    use std::sync::Arc;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_signature_roundtrip_and_tamper() {
        let payload = br#"{"type":"ping"}"#;
        let header = sign_payload(SECRET, NOW, payload);
        assert!(verify_signature(payload, &header, SECRET, NOW + 10).is_ok());
        assert!(verify_signature(br#"{"type":"pong"}"#, &header, SECRET, NOW).is_err());
        assert!(verify_signature(payload, &header, "whsec_other", NOW).is_err());
    }

    #[test]
    fn test_signature_tolerance() {
        let payload = b"{}";
        let header = sign_payload(SECRET, NOW, payload);
        assert!(verify_signature(payload, &header, SECRET, NOW + SIGNATURE_TOLERANCE_SECS).is_ok());
        assert!(verify_signature(payload, &header, SECRET, NOW + SIGNATURE_TOLERANCE_SECS + 1).is_err());
    }

    #[test]
    fn test_malformed_headers() {
        assert!(verify_signature(b"{}", "v1=abcd", SECRET, NOW).is_err());
        assert!(verify_signature(b"{}", &format!("t={}", NOW), SECRET, NOW).is_err());
        assert!(verify_signature(b"{}", &format!("t={},v1=zz", NOW), SECRET, NOW).is_err());
    }

    #[test]
    fn test_any_v1_may_match() {
        let payload = b"{}";
        let good = sign_payload(SECRET, NOW, payload);
        let good_sig = good.split_once("v1=").unwrap().1;
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good_sig);
        assert!(verify_signature(payload, &header, SECRET, NOW).is_ok());
    }

    fn marketplace() -> (MarketplaceService, i64, i64) {
        let db = Arc::new(memory_db());
        let dev = new_user(&db, "dev", UserType::Developer);
        let buyer = new_user(&db, "buyer", UserType::Enterprise);
        let listing = db.create_listing(dev.id, &new_listing("Risk Radar", "finance", 250.0), true).unwrap();
        let service = MarketplaceService::new(db, 0.3, MarketplaceCatalog::builtin().unwrap());
        (service, buyer.id, listing.id)
    }

    #[test]
    fn test_payment_succeeded_creates_purchase() {
        let (service, buyer, agent) = marketplace();
        let payload = serde_json::to_vec(&json!({
            "type": PAYMENT_SUCCEEDED,
            "data": {"object": {"id": "pi_42", "metadata": {"buyer_id": buyer.to_string(), "agent_id": agent.to_string()}}}
        }))
        .unwrap();
        let header = sign_payload(SECRET, NOW, &payload);

        match handle_webhook(&service, Some(SECRET), &payload, Some(&header), NOW).unwrap() {
            WebhookOutcome::Purchased(receipt) => {
                assert_eq!(receipt.purchase.payment_reference.as_deref(), Some("pi_42"));
                assert!((receipt.commission.platform_commission - 75.0).abs() < 1e-9);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(service.has_purchased(buyer, agent).unwrap());
    }

    #[test]
    fn test_redelivered_payment_counts_once() {
        let (service, buyer, agent) = marketplace();
        let payload = serde_json::to_vec(&json!({
            "type": PAYMENT_SUCCEEDED,
            "data": {"object": {"id": "pi_42", "metadata": {"buyer_id": buyer, "agent_id": agent}}}
        }))
        .unwrap();
        let header = sign_payload(SECRET, NOW, &payload);

        let mut keys = Vec::new();
        for _ in 0..2 {
            match handle_webhook(&service, Some(SECRET), &payload, Some(&header), NOW).unwrap() {
                WebhookOutcome::Purchased(receipt) => keys.push(receipt.purchase.license_key),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(keys[0], keys[1]);

        let listing = service.listing(agent).unwrap();
        assert_eq!(listing.download_count, 1);
        assert_eq!(listing.revenue, 250.0);
    }

    #[test]
    fn test_other_events_ignored() {
        let (service, _, _) = marketplace();
        let payload = br#"{"type": "charge.refunded", "data": {"object": {}}}"#;
        let header = sign_payload(SECRET, NOW, payload);
        let outcome = handle_webhook(&service, Some(SECRET), payload, Some(&header), NOW).unwrap();
        assert!(matches!(outcome, WebhookOutcome::Ignored(kind) if kind == "charge.refunded"));
    }

    #[test]
    fn test_webhook_rejections() {
        let (service, _, _) = marketplace();
        let payload = b"not json";
        let header = sign_payload(SECRET, NOW, payload);

        let unconfigured = handle_webhook(&service, None, payload, Some(&header), NOW).unwrap_err();
        assert_eq!(unconfigured.status_code(), actix_web::http::StatusCode::SERVICE_UNAVAILABLE);
        assert!(matches!(
            handle_webhook(&service, Some(SECRET), payload, None, NOW),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            handle_webhook(&service, Some(SECRET), payload, Some(&header), NOW),
            Err(AppError::Validation(_))
        ));
    }
}
