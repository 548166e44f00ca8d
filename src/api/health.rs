//! Health check endpoints
//!
//! Provides health check endpoints for monitoring and load balancers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use tracing::error;

use crate::{db, AppState};

/// Returned in place of the driver error, which stays in the logs
const DATABASE_UNAVAILABLE: &str = "database unavailable";

/// Basic health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness response with component status
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    pub components: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub database: ComponentStatus,
    pub secret_store: ComponentStatus,
}

/// Status of a single component
#[derive(Serialize)]
pub struct ComponentStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentStatus {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            message: None,
        }
    }

    fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message.into()),
        }
    }

    fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: "degraded".to_string(),
            message: Some(message.into()),
        }
    }
}

/// Liveness check (for load balancers)
///
/// Returns 200 OK if the process is running; does not touch the database.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check
///
/// Returns 503 when the database cannot serve tenant lookups. An ephemeral
/// master key is reported as degraded but still ready.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match db::check_health(&state.db).await {
        Ok(()) => ComponentStatus::healthy(),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Readiness check: database unavailable");
            ComponentStatus::unhealthy(DATABASE_UNAVAILABLE)
        }
    };

    let secret_store = if state.secrets.is_ephemeral() {
        ComponentStatus::degraded("ephemeral master key; stored secrets will not survive a restart")
    } else {
        ComponentStatus::healthy()
    };

    let ready = database.status == "healthy";
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadinessResponse {
        status: if ready { "ready" } else { "unavailable" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: ComponentHealth {
            database,
            secret_store,
        },
    };

    (status_code, Json(response))
}
