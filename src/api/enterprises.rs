//! Enterprise administration endpoints
//!
//! Registration is the only place a plaintext secret key is ever returned.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::TenantAdminStore,
    models::{
        EnterpriseSummary, RegisterEnterpriseRequest, RegisterEnterpriseResponse,
        UpdateEnterpriseStatusRequest,
    },
    services::NewEnterprise,
    utils::{validation::validate_payload, AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enterprises).post(register_enterprise))
        .route("/{id}", get(get_enterprise).delete(delete_enterprise))
        .route("/{id}/status", put(update_enterprise_status))
}

async fn register_enterprise(
    State(state): State<AppState>,
    Json(payload): Json<RegisterEnterpriseRequest>,
) -> AppResult<(StatusCode, Json<RegisterEnterpriseResponse>)> {
    validate_payload(&payload)?;

    let issued = state
        .issuer
        .issue(NewEnterprise {
            name: payload.name,
            wecom_corp_id: payload.wecom_corp_id,
            wecom_secret: SecretString::from(payload.wecom_secret),
        })
        .await?;

    let response = RegisterEnterpriseResponse {
        enterprise_id: issued.enterprise.id,
        name: issued.enterprise.name,
        api_key: issued.api_key,
        secret_key: issued.secret_key.expose_secret().to_string(),
        created_at: issued.enterprise.created_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_enterprises(State(state): State<AppState>) -> AppResult<Json<Vec<EnterpriseSummary>>> {
    let enterprises = state.tenants.list().await?;
    Ok(Json(enterprises.iter().map(|e| e.summary()).collect()))
}

async fn get_enterprise(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EnterpriseSummary>> {
    state
        .tenants
        .get_by_id(id)
        .await?
        .map(|e| Json(e.summary()))
        .ok_or_else(|| AppError::not_found(format!("Enterprise {} not found", id)))
}

async fn update_enterprise_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEnterpriseStatusRequest>,
) -> AppResult<Json<EnterpriseSummary>> {
    if !state.tenants.set_active(id, payload.is_active).await? {
        return Err(AppError::not_found(format!("Enterprise {} not found", id)));
    }

    info!(enterprise_id = %id, is_active = payload.is_active, "Updated enterprise status");

    state
        .tenants
        .get_by_id(id)
        .await?
        .map(|e| Json(e.summary()))
        .ok_or_else(|| AppError::not_found(format!("Enterprise {} not found", id)))
}

async fn delete_enterprise(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.tenants.delete(id).await? {
        return Err(AppError::not_found(format!("Enterprise {} not found", id)));
    }

    info!(enterprise_id = %id, "Deleted enterprise and retired its api key");
    Ok(StatusCode::NO_CONTENT)
}
