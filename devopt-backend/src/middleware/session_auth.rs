// Bearer session helpers for protected routes.
// Handlers call `require_user` (or `optional_user`) with the request instead of
// wrapping scopes, so public and protected routes can share a scope.

use actix_web::HttpRequest;

use crate::auth::AuthService;
use crate::error::{AppError, AppResult};
use crate::models::User;

pub fn extract_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The signed-in user, or 401
pub fn require_user(auth: &AuthService, req: &HttpRequest) -> AppResult<User> {
    let token = extract_token(req)
        .ok_or_else(|| AppError::Unauthorized("No authorization token provided".into()))?;
    auth.current_user(&token)?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".into()))
}

/// The signed-in user when a valid token is present
pub fn optional_user(auth: &AuthService, req: &HttpRequest) -> AppResult<Option<User>> {
    match extract_token(req) {
        Some(token) => auth.current_user(&token),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_extract_token() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc123"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("abc123"));

        let bare = TestRequest::default().to_http_request();
        assert!(extract_token(&bare).is_none());

        let empty = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();
        assert!(extract_token(&empty).is_none());
    }
}
