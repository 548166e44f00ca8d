//! Error types and handling
//!
//! Every handler error is converted to the same JSON body,
//! `{ "error": <kind>, "message": <text> }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;
use crate::services::authenticator::AuthError;
use crate::services::credentials::IssueError;

/// Generic text for failures whose cause must not reach the caller
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - malformed input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication headers absent (401)
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Admin bearer token missing or wrong (401)
    #[error("Authentication required: {0}")]
    AdminUnauthorized(String),

    /// Unknown key, inactive tenant or bad signature (403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request body over the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Unprocessable entity - validation failed (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal server error (500); the message is logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    /// Machine-readable kind and HTTP status
    pub fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::MissingCredentials(_) => (StatusCode::UNAUTHORIZED, "missing_credentials"),
            AppError::AdminUnauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Unauthorized(_) => (StatusCode::FORBIDDEN, "unauthorized"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::ValidationError(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.kind();

        let message = match &self {
            AppError::Internal(_) => {
                error!(error = %self, error_type, "Request error");
                INTERNAL_MESSAGE.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse::new(error_type, message))).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                AppError::MissingCredentials("X-API-Key and X-Signature headers are required".to_string())
            }
            AuthError::Unauthorized => {
                AppError::Unauthorized("Invalid API key or signature".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<IssueError> for AppError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::DuplicateTenant(field) => {
                AppError::Conflict(format!("Enterprise with this {} already exists", field))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => {
                AppError::Conflict(format!("Enterprise with this {} already exists", field))
            }
            StoreError::Backend(e) => AppError::Internal(format!("{:#}", e)),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
