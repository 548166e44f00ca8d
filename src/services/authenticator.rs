//! HMAC request authentication
//!
//! A request is accepted when it carries an `X-API-Key` naming an active
//! enterprise and an `X-Signature` equal to
//! `hex(HMAC-SHA256(secret_key, raw_body))`. The body is signed exactly as
//! received, before any content parsing.
//!
//! Unknown keys, inactive enterprises and bad signatures all produce the same
//! [`AuthError::Unauthorized`]. Decryption and store failures are operational
//! faults and are never reported as an authentication failure.

use std::sync::Arc;

use axum::http::HeaderMap;
use hmac::{digest::InvalidLength, Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::db::{StoreError, TenantStore};
use crate::models::{Enterprise, EnterpriseIdentity, WeComCredentials};
use crate::services::credentials::api_key_prefix;
use crate::services::secret_store::{DecryptionError, SecretStore};

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authentication headers")]
    MissingCredentials,
    #[error("invalid api key or signature")]
    Unauthorized,
    #[error("secret decryption failed for enterprise {enterprise_id}: {source}")]
    Decryption {
        enterprise_id: Uuid,
        #[source]
        source: DecryptionError,
    },
    #[error("tenant lookup failed: {0}")]
    Store(#[from] StoreError),
    #[error("signature computation failed for enterprise {enterprise_id}")]
    Signing { enterprise_id: Uuid },
}

/// Authentication inputs extracted from an inbound request
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
    pub api_key: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
}

impl<'a> SignedRequest<'a> {
    /// Pull the API key and signature headers; empty or non-ASCII values count
    /// as absent
    pub fn from_headers(headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        Self {
            api_key: header_value(headers, API_KEY_HEADER),
            signature: header_value(headers, SIGNATURE_HEADER),
            body,
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Lowercase hex HMAC-SHA256 of `body` under `secret`
pub fn sign_body(secret: &str, body: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies signed requests against the tenant record store
pub struct Authenticator {
    store: Arc<dyn TenantStore>,
    secrets: Arc<SecretStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn TenantStore>, secrets: Arc<SecretStore>) -> Self {
        Self { store, secrets }
    }

    /// Authenticate one request
    ///
    /// Performs at most one store read and never mutates tenant state.
    pub async fn authenticate(
        &self,
        request: &SignedRequest<'_>,
    ) -> Result<EnterpriseIdentity, AuthError> {
        let (Some(api_key), Some(signature)) = (request.api_key, request.signature) else {
            return Err(AuthError::MissingCredentials);
        };

        let enterprise = match self.store.find_by_api_key(api_key).await? {
            Some(enterprise) if enterprise.is_active => enterprise,
            Some(enterprise) => {
                debug!(enterprise_id = %enterprise.id, "Rejected request for inactive enterprise");
                return Err(AuthError::Unauthorized);
            }
            None => {
                debug!(
                    api_key_prefix = api_key_prefix(api_key),
                    "Rejected request for unknown api key"
                );
                return Err(AuthError::Unauthorized);
            }
        };

        let secret = self.open_secret(&enterprise, &enterprise.encrypted_secret)?;
        let expected = sign_body(secret.expose_secret(), request.body).map_err(|_| {
            error!(enterprise_id = %enterprise.id, "Failed to key HMAC with enterprise secret");
            AuthError::Signing {
                enterprise_id: enterprise.id,
            }
        })?;

        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            debug!(enterprise_id = %enterprise.id, "Rejected request with invalid signature");
            return Err(AuthError::Unauthorized);
        }

        let corp_secret = self.open_secret(&enterprise, &enterprise.encrypted_wecom_secret)?;

        Ok(EnterpriseIdentity {
            enterprise_id: enterprise.id,
            name: enterprise.name,
            api_key: enterprise.api_key,
            wecom: WeComCredentials {
                corp_id: enterprise.wecom_corp_id,
                corp_secret,
            },
        })
    }

    fn open_secret(&self, enterprise: &Enterprise, blob: &[u8]) -> Result<SecretString, AuthError> {
        let decryption_failed = |source: DecryptionError| {
            error!(
                enterprise_id = %enterprise.id,
                error_kind = source.kind(),
                key_fingerprint = %self.secrets.key_fingerprint(),
                "Failed to decrypt enterprise secret; check the configured master key"
            );
            AuthError::Decryption {
                enterprise_id: enterprise.id,
                source,
            }
        };

        let plaintext = self.secrets.decrypt(blob).map_err(decryption_failed)?;
        String::from_utf8(plaintext)
            .map(SecretString::from)
            .map_err(|_| decryption_failed(DecryptionError::Malformed))
    }
}
