//! Enterprise credential issuance
//!
//! Mints the API key / secret key pair for a new enterprise, seals the
//! secrets with the [`SecretStore`] and persists the record. The plaintext
//! secret key leaves this module exactly once, in [`IssuedCredentials`].

use std::sync::Arc;

use chrono::Utc;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{DuplicateField, StoreError, TenantStore};
use crate::models::Enterprise;
use crate::services::secret_store::{SecretStore, SecretStoreError};

/// Length of the public API key (62-symbol alphabet, ~190 bits)
pub const API_KEY_LENGTH: usize = 32;

/// Length of the signing secret (62-symbol alphabet, ~381 bits)
pub const SECRET_KEY_LENGTH: usize = 64;

/// Attempts made when a freshly drawn API key collides
const MAX_ISSUE_ATTEMPTS: usize = 2;

/// Draw a random string over `[A-Za-z0-9]` from the OS CSPRNG
pub fn generate_secure_key(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Prefix of an API key that is safe to put in logs
pub fn api_key_prefix(api_key: &str) -> &str {
    api_key.get(..8).unwrap_or(api_key)
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("enterprise with this {0} already exists")]
    DuplicateTenant(DuplicateField),
    #[error("failed to encrypt enterprise secret")]
    Encryption(#[from] SecretStoreError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for IssueError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => IssueError::DuplicateTenant(field),
            other => IssueError::Store(other),
        }
    }
}

/// Registration input for a new enterprise
#[derive(Debug, Clone)]
pub struct NewEnterprise {
    pub name: String,
    pub wecom_corp_id: String,
    pub wecom_secret: SecretString,
}

/// Credentials handed to the registering caller
#[derive(Debug)]
pub struct IssuedCredentials {
    pub enterprise: Enterprise,
    pub api_key: String,
    pub secret_key: SecretString,
}

/// Issues credentials and creates enterprise records
pub struct CredentialIssuer {
    store: Arc<dyn TenantStore>,
    secrets: Arc<SecretStore>,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn TenantStore>, secrets: Arc<SecretStore>) -> Self {
        Self { store, secrets }
    }

    /// Register an enterprise and return its credentials
    ///
    /// A name collision fails immediately. An API key collision is retried
    /// once with freshly drawn credentials before it is reported.
    pub async fn issue(&self, request: NewEnterprise) -> Result<IssuedCredentials, IssueError> {
        let encrypted_wecom_secret = self
            .secrets
            .encrypt(request.wecom_secret.expose_secret().as_bytes())?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let api_key = generate_secure_key(API_KEY_LENGTH);
            let secret_key = SecretString::from(generate_secure_key(SECRET_KEY_LENGTH));
            let encrypted_secret = self.secrets.encrypt(secret_key.expose_secret().as_bytes())?;

            let record = Enterprise {
                id: Uuid::new_v4(),
                name: request.name.clone(),
                api_key: api_key.clone(),
                encrypted_secret,
                is_active: true,
                wecom_corp_id: request.wecom_corp_id.clone(),
                encrypted_wecom_secret: encrypted_wecom_secret.clone(),
                created_at: Utc::now(),
            };

            match self.store.insert(&record).await {
                Ok(enterprise) => {
                    info!(
                        enterprise_id = %enterprise.id,
                        name = %enterprise.name,
                        api_key_prefix = api_key_prefix(&api_key),
                        "Issued enterprise credentials"
                    );
                    return Ok(IssuedCredentials {
                        enterprise,
                        api_key,
                        secret_key,
                    });
                }
                Err(StoreError::Duplicate(DuplicateField::ApiKey))
                    if attempt < MAX_ISSUE_ATTEMPTS =>
                {
                    warn!(
                        name = %request.name,
                        attempt,
                        "Generated api key collided, retrying with fresh credentials"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
