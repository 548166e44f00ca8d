//! Test factories for generating test data
//!
//! Factories create unique enterprises per call so tests never collide on
//! the `name` uniqueness constraint.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use wecom_relay::{models::Enterprise, services::SecretStore};

use super::fixtures::{TEST_CORP_ID, TEST_CORP_SECRET};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique enterprise name with a readable prefix
pub fn unique_name(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{} {}", prefix, n)
}

/// JSON body for `POST /api/v1/enterprises`
pub fn register_request(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "wecom_corp_id": TEST_CORP_ID,
        "wecom_secret": TEST_CORP_SECRET,
    })
}

/// Builder for enterprise records sealed with a given secret store
pub struct EnterpriseBuilder {
    name: String,
    api_key: String,
    secret_key: String,
    is_active: bool,
}

impl EnterpriseBuilder {
    pub fn new() -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self {
            name: format!("enterprise-{}", n),
            api_key: format!("api-key-{:024}", n),
            secret_key: format!("secret-key-{:053}", n),
            is_active: true,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = api_key.to_string();
        self
    }

    pub fn with_secret_key(mut self, secret_key: &str) -> Self {
        self.secret_key = secret_key.to_string();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn build(&self, secrets: &SecretStore) -> Enterprise {
        Enterprise {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            api_key: self.api_key.clone(),
            encrypted_secret: secrets
                .encrypt(self.secret_key.as_bytes())
                .expect("Failed to seal secret key"),
            is_active: self.is_active,
            wecom_corp_id: TEST_CORP_ID.to_string(),
            encrypted_wecom_secret: secrets
                .encrypt(TEST_CORP_SECRET.as_bytes())
                .expect("Failed to seal corp secret"),
            created_at: Utc::now(),
        }
    }
}

impl Default for EnterpriseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
