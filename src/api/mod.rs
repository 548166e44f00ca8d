//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{
    http::{
        header::{CACHE_CONTROL, X_CONTENT_TYPE_OPTIONS},
        HeaderValue,
    },
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::{middleware, AppState};

mod enterprises;
mod gateway;
mod health;

pub use health::*;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
}

/// Tenant administration routes (admin bearer token required)
pub fn admin_routes() -> Router<AppState> {
    Router::new().nest("/enterprises", enterprises::routes())
}

/// Routes for enterprise clients (signed requests required)
pub fn gateway_routes() -> Router<AppState> {
    Router::new().nest("/gateway", gateway::routes())
}

/// Create the full API router with its authentication layers
///
/// Responses are never cacheable since some carry freshly issued secrets.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", public_routes())
        .nest(
            "/api/v1",
            admin_routes().layer(from_fn_with_state(
                state.clone(),
                middleware::admin_auth_middleware,
            )),
        )
        .nest(
            "/api/v1",
            gateway_routes().layer(from_fn_with_state(
                state.clone(),
                middleware::enterprise_auth_middleware,
            )),
        )
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}
