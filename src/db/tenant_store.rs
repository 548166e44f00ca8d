//! Tenant record store interfaces
//!
//! The authenticator depends only on [`TenantStore`]; administration
//! endpoints additionally use [`TenantAdminStore`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Enterprise;

/// Which unique column an insert collided on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Name,
    ApiKey,
}

impl std::fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateField::Name => f.write_str("name"),
            DuplicateField::ApiKey => f.write_str("api_key"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("enterprise with this {0} already exists")]
    Duplicate(DuplicateField),
    #[error("tenant store failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable mapping from API key to enterprise record
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Look up an enterprise by its public API key
    async fn find_by_api_key(&self, api_key: &str) -> StoreResult<Option<Enterprise>>;

    /// Persist a new enterprise
    ///
    /// Fails with [`StoreError::Duplicate`] when the name or API key is taken,
    /// including API keys of deleted enterprises.
    async fn insert(&self, enterprise: &Enterprise) -> StoreResult<Enterprise>;
}

/// Administrative operations on enterprise records
#[async_trait]
pub trait TenantAdminStore: TenantStore {
    async fn list(&self) -> StoreResult<Vec<Enterprise>>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Enterprise>>;

    /// Toggle the active flag; returns false when the enterprise does not exist
    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<bool>;

    /// Delete an enterprise and retire its API key; returns false when absent
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}
