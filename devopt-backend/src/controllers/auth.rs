use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::auth::{LoginRequest, RegisterRequest};
use crate::controllers::{created, success};
use crate::error::{AppError, AppResult};
use crate::middleware::session_auth::{extract_token, require_user};
use crate::models::User;
use crate::AppState;

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    token: String,
    expires_at: i64,
    user: User,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

async fn register(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> AppResult<HttpResponse> {
    Ok(created(state.auth.register(&body)?))
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> AppResult<HttpResponse> {
    let (session, user) = state.auth.login(&body)?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        token: session.token,
        expires_at: session.expires_at.timestamp(),
        user,
    }))
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let token = extract_token(&req)
        .ok_or_else(|| AppError::Unauthorized("No authorization token provided".into()))?;
    let removed = state.auth.logout(&token)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": removed })))
}

async fn me(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    Ok(success(require_user(&state.auth, &req)?))
}
