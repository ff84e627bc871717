//! Agent marketplace: listings, reviews, subscriptions and developer analytics

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::controllers::{created, success};
use crate::error::AppResult;
use crate::marketplace::SearchParams;
use crate::middleware::session_auth::{optional_user, require_user};
use crate::models::{MarketplaceAgent, NewListing, NewReview, Review};
use crate::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

impl LimitQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Deserialize)]
pub struct UsageQuery {
    #[serde(default)]
    api_calls: u64,
    #[serde(default)]
    agents: u64,
}

fn default_verified() -> bool {
    true
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default = "default_verified")]
    verified: bool,
}

#[derive(Serialize)]
struct ListingDetail {
    agent: MarketplaceAgent,
    reviews: Vec<Review>,
    has_purchased: bool,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/marketplace")
            .route("/agents", web::get().to(search_agents))
            .route("/agents", web::post().to(create_listing))
            .route("/agents/{id}", web::get().to(get_agent))
            .route("/agents/{id}/reviews", web::get().to(list_reviews))
            .route("/agents/{id}/reviews", web::post().to(add_review))
            .route("/agents/{id}/verify", web::post().to(verify_listing))
            .route("/purchases", web::get().to(purchases))
            .route("/trending", web::get().to(trending))
            .route("/recommendations", web::get().to(recommendations))
            .route("/stats", web::get().to(stats))
            .route("/tiers", web::get().to(tiers))
            .route("/catalog", web::get().to(catalog))
            .route("/usage", web::get().to(usage))
            .route("/analytics/{id}", web::get().to(listing_analytics))
            .route("/developer/dashboard", web::get().to(developer_dashboard)),
    );
}

async fn search_agents(state: web::Data<AppState>, query: web::Query<SearchParams>) -> AppResult<HttpResponse> {
    let filter = query.into_inner().into_filter()?;
    Ok(success(state.marketplace.search(&filter)?))
}

async fn get_agent(state: web::Data<AppState>, req: HttpRequest, path: web::Path<i64>) -> AppResult<HttpResponse> {
    let agent_id = path.into_inner();
    let agent = state.marketplace.view_listing(agent_id)?;
    let has_purchased = match optional_user(&state.auth, &req)? {
        Some(user) => state.marketplace.has_purchased(user.id, agent_id)?,
        None => false,
    };
    Ok(success(ListingDetail {
        reviews: state.marketplace.reviews(agent_id)?,
        agent,
        has_purchased,
    }))
}

async fn create_listing(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<NewListing>,
) -> AppResult<HttpResponse> {
    let user = require_user(&state.auth, &req)?;
    Ok(created(state.marketplace.create_listing(&user, &body)?))
}

/// Admin only; an empty body verifies
async fn verify_listing(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: Option<web::Json<VerifyRequest>>,
) -> AppResult<HttpResponse> {
    let admin = require_user(&state.auth, &req)?;
    let verified = body.map(|b| b.verified).unwrap_or(true);
    Ok(success(state.marketplace.set_verified(&admin, path.into_inner(), verified)?))
}

async fn purchases(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let user = require_user(&state.auth, &req)?;
    Ok(success(state.marketplace.purchases(&user)?))
}

async fn list_reviews(state: web::Data<AppState>, path: web::Path<i64>) -> AppResult<HttpResponse> {
    Ok(success(state.marketplace.reviews(path.into_inner())?))
}

async fn add_review(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<NewReview>,
) -> AppResult<HttpResponse> {
    let user = require_user(&state.auth, &req)?;
    Ok(created(state.marketplace.add_review(&user, path.into_inner(), &body)?))
}

async fn trending(state: web::Data<AppState>, query: web::Query<LimitQuery>) -> AppResult<HttpResponse> {
    Ok(success(state.marketplace.trending(query.limit())?))
}

async fn recommendations(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LimitQuery>,
) -> AppResult<HttpResponse> {
    let user = require_user(&state.auth, &req)?;
    Ok(success(state.marketplace.recommendations(user.id, query.limit())?))
}

async fn stats(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.marketplace.stats()?))
}

async fn tiers(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.marketplace.catalog().tiers()))
}

async fn catalog(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(success(state.marketplace.catalog().premium_catalog()))
}

/// Check the caller's usage against their subscription tier
async fn usage(state: web::Data<AppState>, req: HttpRequest, query: web::Query<UsageQuery>) -> AppResult<HttpResponse> {
    let user = require_user(&state.auth, &req)?;
    let check = state
        .marketplace
        .catalog()
        .check_usage(user.subscription_tier, query.api_calls, query.agents)?;
    Ok(success(check))
}

async fn listing_analytics(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let user = require_user(&state.auth, &req)?;
    Ok(success(state.marketplace.listing_analytics(&user, path.into_inner())?))
}

async fn developer_dashboard(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let user = require_user(&state.auth, &req)?;
    Ok(success(state.marketplace.developer_dashboard(&user)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LoginRequest, RegisterRequest};
    use crate::controllers::test_state;
    use crate::AppState;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn sign_up(state: &AppState, username: &str, user_type: &str) -> String {
        state
            .auth
            .register(&RegisterRequest {
                username: username.into(),
                email: format!("{}@example.com", username),
                password: "long enough".into(),
                company_name: None,
                user_type: user_type.into(),
            })
            .unwrap();
        let (session, _) = state
            .auth
            .login(&LoginRequest {
                username: username.into(),
                password: "long enough".into(),
            })
            .unwrap();
        format!("Bearer {}", session.token)
    }

    #[actix_web::test]
    async fn test_search_and_catalog() {
        let state = test_state();
        crate::marketplace::seed::seed_sample_data(&state.db, None).unwrap();
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::get()
            .uri("/api/marketplace/agents?price_range=high")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["name"], "Healthcare Data Intelligence");

        let req = test::TestRequest::get()
            .uri("/api/marketplace/agents?price_range=luxury")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/marketplace/tiers").to_request())
                .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/marketplace/catalog").to_request())
                .await;
        assert_eq!(body["data"]["total_agents"], 20);
    }

    #[actix_web::test]
    async fn test_listing_requires_developer() {
        let state = test_state();
        let developer = sign_up(&state, "dev", "developer");
        let buyer = sign_up(&state, "buyer", "enterprise");
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let listing = json!({
            "name": "Churn Predictor",
            "description": "Predicts customer churn",
            "category": "analytics",
            "industry": "saas",
            "pricing_model": "subscription",
            "price": 300.0
        });

        let req = test::TestRequest::post()
            .uri("/api/marketplace/agents")
            .set_json(listing.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/marketplace/agents")
            .insert_header(("Authorization", buyer.clone()))
            .set_json(listing.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/marketplace/agents")
            .insert_header(("Authorization", developer.clone()))
            .set_json(listing)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let agent_id = body["data"]["id"].as_i64().unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("/api/marketplace/analytics/{}", agent_id))
            .insert_header(("Authorization", buyer))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/marketplace/developer/dashboard")
            .insert_header(("Authorization", developer))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["agents"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_admin_verifies_developer_listing() {
        let state = test_state();
        let developer = sign_up(&state, "dev", "developer");
        state
            .db
            .create_user(
                "root",
                "root@example.com",
                &crate::auth::hash_password("admin passphrase"),
                None,
                crate::models::UserType::Admin,
                crate::models::SubscriptionTier::Enterprise,
            )
            .unwrap();
        let (session, _) = state
            .auth
            .login(&LoginRequest {
                username: "root".into(),
                password: "admin passphrase".into(),
            })
            .unwrap();
        let admin = format!("Bearer {}", session.token);
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/marketplace/agents")
            .insert_header(("Authorization", developer.clone()))
            .set_json(json!({
                "name": "Invoice Reader",
                "description": "Extracts invoice fields",
                "category": "finance",
                "industry": "accounting",
                "pricing_model": "subscription",
                "price": 0.0
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let agent_id = body["data"]["id"].as_i64().unwrap();
        assert_eq!(body["data"]["is_verified"], false);

        let req = test::TestRequest::post()
            .uri(&format!("/api/marketplace/agents/{}/verify", agent_id))
            .insert_header(("Authorization", developer))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&format!("/api/marketplace/agents/{}/verify", agent_id))
            .insert_header(("Authorization", admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["is_verified"], true);

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/marketplace/agents").to_request())
                .await;
        assert_eq!(body["data"][0]["name"], "Invoice Reader");
    }

    #[actix_web::test]
    async fn test_purchases_listed_for_buyer() {
        let state = test_state();
        assert!(crate::marketplace::seed::seed_sample_data(&state.db, None).unwrap());
        let buyer = sign_up(&state, "buyer", "enterprise");
        let buyer_id = state.auth.current_user(buyer.trim_start_matches("Bearer ")).unwrap().unwrap().id;
        let listing = state.marketplace.search(&Default::default()).unwrap().remove(0);
        state.marketplace.process_purchase(buyer_id, listing.id, Some("pi_9")).unwrap();
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::get()
            .uri("/api/marketplace/purchases")
            .insert_header(("Authorization", buyer))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["payment_reference"], "pi_9");

        let req = test::TestRequest::get().uri("/api/marketplace/purchases").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_usage_for_starter_tier() {
        let state = test_state();
        let token = sign_up(&state, "small", "enterprise");
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(config)).await;

        let req = test::TestRequest::get()
            .uri("/api/marketplace/usage?api_calls=1200&agents=2")
            .insert_header(("Authorization", token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["within_limits"], false);
        assert_eq!(body["data"]["exceeded"][0], "api_calls");
    }
}
