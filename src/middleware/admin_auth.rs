//! Admin bearer-token middleware for tenant administration routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{utils::AppError, AppState};

/// Extract bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Compare a presented token with the configured one in constant time
pub fn admin_token_matches(expected: &str, presented: &str) -> bool {
    bool::from(expected.as_bytes().ct_eq(presented.as_bytes()))
}

/// Require `Authorization: Bearer <admin.token>`
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| AppError::AdminUnauthorized("Missing admin bearer token".to_string()))?;

    if !admin_token_matches(&state.config.admin.token, token) {
        warn!(path = %request.uri().path(), "Rejected admin request with invalid token");
        return Err(AppError::AdminUnauthorized("Invalid admin token".to_string()));
    }

    Ok(next.run(request).await)
}
