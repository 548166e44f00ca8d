//! Signed-request middleware
//!
//! Buffers the raw request body, verifies `X-API-Key` / `X-Signature`
//! against it and, on success, hands the request on with an
//! [`EnterpriseIdentity`] in its extensions. The body reaches the handler
//! byte-for-byte as it was signed.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::CONTENT_LENGTH, request::Parts},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use tracing::debug;

use crate::{
    models::EnterpriseIdentity,
    services::SignedRequest,
    utils::AppError,
    AppState,
};

/// Reject requests that are not signed by an active enterprise
pub async fn enterprise_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let limit = state.config.server.max_body_bytes;
    let (mut parts, body) = request.into_parts();

    let declared_length = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_length.is_some_and(|len| len > limit) {
        return Err(payload_too_large(limit));
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|err| {
        if is_length_limit(&err) {
            payload_too_large(limit)
        } else {
            debug!(error = %err, "Failed to read request body");
            AppError::bad_request("Failed to read request body")
        }
    })?;

    let identity = {
        let signed = SignedRequest::from_headers(&parts.headers, &bytes);
        state.authenticator.authenticate(&signed).await?
    };

    debug!(enterprise_id = %identity.enterprise_id, "Authenticated signed request");
    parts.extensions.insert(identity);

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn payload_too_large(limit: usize) -> AppError {
    AppError::PayloadTooLarge(format!("Request body exceeds {} bytes", limit))
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = Some(err as &(dyn std::error::Error + 'static));
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Extractor for the identity established by [`enterprise_auth_middleware`]
impl<S> FromRequestParts<S> for EnterpriseIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<EnterpriseIdentity>()
            .cloned()
            .ok_or_else(|| {
                AppError::MissingCredentials("Request was not authenticated".to_string())
            })
    }
}
