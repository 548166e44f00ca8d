//! WeCom Relay Library
//!
//! Multi-tenant credential issuance, envelope encryption of tenant secrets
//! and HMAC-SHA256 request authentication for the WeCom messaging relay.

use std::sync::Arc;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::info;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use models::EnterpriseIdentity;

use config::MasterKeySource;
use db::SqliteTenantStore;
use services::{Authenticator, CredentialIssuer, MasterKey, SecretStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Master-key cipher for tenant secrets
    pub secrets: Arc<SecretStore>,
    /// Tenant record store
    pub tenants: Arc<SqliteTenantStore>,
    /// Verifies signed enterprise requests
    pub authenticator: Arc<Authenticator>,
    /// Registers enterprises and mints their credentials
    pub issuer: Arc<CredentialIssuer>,
}

impl AppState {
    /// Wire the components around an initialized pool and secret store
    pub fn new(config: AppConfig, db: DbPool, secrets: Arc<SecretStore>) -> Self {
        let tenants = Arc::new(SqliteTenantStore::new(db.clone()));
        let authenticator = Arc::new(Authenticator::new(tenants.clone(), secrets.clone()));
        let issuer = Arc::new(CredentialIssuer::new(tenants.clone(), secrets.clone()));

        Self {
            config,
            db,
            secrets,
            tenants,
            authenticator,
            issuer,
        }
    }
}

/// Build the secret store from the configured master key source
pub fn build_secret_store(config: &config::SecretsConfig) -> Result<SecretStore> {
    let store = match config.source()? {
        MasterKeySource::Key(encoded) => {
            SecretStore::new(MasterKey::from_base64(encoded).context("Invalid secrets.master_key")?)
        }
        MasterKeySource::Passphrase { passphrase, salt } => {
            let salt = BASE64
                .decode(salt)
                .context("secrets.kdf_salt is not valid base64")?;
            let key = MasterKey::derive_from_passphrase(passphrase, &salt)
                .context("Failed to derive master key from passphrase")?;
            SecretStore::new(key)
        }
        MasterKeySource::Ephemeral => SecretStore::ephemeral(),
    };

    info!(
        key_fingerprint = %store.key_fingerprint(),
        ephemeral = store.is_ephemeral(),
        "Secret store initialized"
    );

    Ok(store)
}
