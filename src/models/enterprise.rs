//! Enterprise (tenant) models

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A registered enterprise as persisted by the tenant record store
///
/// Secrets are held only as opaque blobs sealed by the secret store.
#[derive(Debug, Clone)]
pub struct Enterprise {
    pub id: Uuid,
    pub name: String,
    pub api_key: String,
    pub encrypted_secret: Vec<u8>,
    pub is_active: bool,
    pub wecom_corp_id: String,
    pub encrypted_wecom_secret: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Enterprise {
    /// Public view of the record, without secret material
    pub fn summary(&self) -> EnterpriseSummary {
        EnterpriseSummary {
            id: self.id,
            name: self.name.clone(),
            api_key: self.api_key.clone(),
            is_active: self.is_active,
            wecom_corp_id: self.wecom_corp_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Enterprise as returned by the administration API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnterpriseSummary {
    pub id: Uuid,
    pub name: String,
    pub api_key: String,
    pub is_active: bool,
    pub wecom_corp_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterEnterpriseRequest {
    #[validate(
        length(min = 1, max = 100),
        custom(function = "crate::utils::validation::validate_display_name")
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 100),
        custom(function = "crate::utils::validation::validate_corp_id")
    )]
    pub wecom_corp_id: String,
    #[validate(length(min = 1))]
    pub wecom_secret: String,
}

/// Issued credentials, returned exactly once at registration
#[derive(Debug, Clone, Serialize)]
pub struct RegisterEnterpriseResponse {
    pub enterprise_id: Uuid,
    pub name: String,
    pub api_key: String,
    /// Plaintext signing secret (only returned on creation)
    pub secret_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEnterpriseStatusRequest {
    pub is_active: bool,
}

/// WeCom provider credentials of an authenticated enterprise
#[derive(Debug, Clone)]
pub struct WeComCredentials {
    pub corp_id: String,
    pub corp_secret: SecretString,
}

/// The enterprise behind a successfully verified request
///
/// Inserted into request extensions by the signature middleware.
#[derive(Debug, Clone)]
pub struct EnterpriseIdentity {
    pub enterprise_id: Uuid,
    pub name: String,
    pub api_key: String,
    pub wecom: WeComCredentials,
}

/// Identity fields safe to echo back to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentitySummary {
    pub enterprise_id: Uuid,
    pub name: String,
    pub wecom_corp_id: String,
}

impl From<&EnterpriseIdentity> for IdentitySummary {
    fn from(identity: &EnterpriseIdentity) -> Self {
        Self {
            enterprise_id: identity.enterprise_id,
            name: identity.name.clone(),
            wecom_corp_id: identity.wecom.corp_id.clone(),
        }
    }
}
