//! Tenant secret encryption using ChaCha20-Poly1305
//!
//! A single master key protects every per-tenant secret at rest. Secrets are
//! sealed into a self-describing blob:
//!
//! ```text
//! version (1) || key_id (4) || nonce (12) || ciphertext + tag
//! ```
//!
//! The `key_id` lets `decrypt` tell a master-key mismatch apart from a
//! corrupted blob, which matters to operators: a mismatch means every tenant
//! is failing, not one.
//!
//! The master key must stay the same for the lifetime of the stored data.
//! [`SecretStore::ephemeral`] exists for tests and throwaway environments
//! only; anything it encrypts is unrecoverable after the process exits.

use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

/// Length of the master key in bytes
pub const MASTER_KEY_LEN: usize = 32;

const BLOB_VERSION: u8 = 1;
const KEY_ID_LEN: usize = 4;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + KEY_ID_LEN + NONCE_LEN;
const KEY_ID_LABEL: &[u8] = b"wecom-relay/master-key-id/v1";

/// Why a stored secret could not be decrypted
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("encrypted secret is truncated or malformed")]
    Malformed,
    #[error("encrypted secret has unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("encrypted secret was sealed under a different master key")]
    KeyMismatch,
    #[error("encrypted secret failed its integrity check")]
    IntegrityCheckFailed,
}

impl DecryptionError {
    /// Stable identifier for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DecryptionError::Malformed => "malformed",
            DecryptionError::UnsupportedVersion(_) => "unsupported_version",
            DecryptionError::KeyMismatch => "key_mismatch",
            DecryptionError::IntegrityCheckFailed => "integrity_check_failed",
        }
    }
}

/// Secret store errors
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error(transparent)]
    Decryption(#[from] DecryptionError),
    #[error("encryption failed")]
    Encryption,
    #[error("invalid master key: {0}")]
    InvalidMasterKey(String),
}

/// The symmetric key protecting all tenant secrets
pub struct MasterKey {
    bytes: SecretBox<[u8; MASTER_KEY_LEN]>,
}

impl MasterKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self {
            bytes: SecretBox::new(Box::new(bytes)),
        }
    }

    /// Decode a base64 master key (as produced by `--generate-master-key`)
    pub fn from_base64(encoded: &str) -> Result<Self, SecretStoreError> {
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|_| SecretStoreError::InvalidMasterKey("not valid base64".to_string()))?;

        let bytes: [u8; MASTER_KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            SecretStoreError::InvalidMasterKey(format!(
                "expected {} bytes, got {}",
                MASTER_KEY_LEN,
                decoded.len()
            ))
        })?;

        Ok(Self::from_bytes(bytes))
    }

    /// Derive a master key from a passphrase using Argon2id
    ///
    /// The salt must be stable across restarts; it is part of the key.
    pub fn derive_from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, SecretStoreError> {
        let mut key = [0u8; MASTER_KEY_LEN];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| SecretStoreError::InvalidMasterKey(format!("key derivation failed: {}", e)))?;

        Ok(Self::from_bytes(key))
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; MASTER_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self::from_bytes(key)
    }

    /// Base64 form, for provisioning output only
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes.expose_secret())
    }

    /// Short identifier of this key, safe to log
    pub fn fingerprint(&self) -> String {
        hex::encode(self.key_id())
    }

    fn key_id(&self) -> [u8; KEY_ID_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(KEY_ID_LABEL);
        hasher.update(self.bytes.expose_secret());
        let digest = hasher.finalize();

        let mut id = [0u8; KEY_ID_LEN];
        id.copy_from_slice(&digest[..KEY_ID_LEN]);
        id
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Authenticated encryption of tenant secrets under one master key
///
/// Holds no mutable state; share it behind an `Arc` across request handlers.
pub struct SecretStore {
    cipher: ChaCha20Poly1305,
    key_id: [u8; KEY_ID_LEN],
    fingerprint: String,
    ephemeral: bool,
}

impl SecretStore {
    /// Create a store bound to an externally supplied master key
    pub fn new(master_key: MasterKey) -> Self {
        Self::build(master_key, false)
    }

    /// Create a store with a random, process-local master key
    ///
    /// Secrets encrypted by this store cannot be decrypted after a restart.
    pub fn ephemeral() -> Self {
        let key = MasterKey::generate();
        warn!(
            key_fingerprint = %key.fingerprint(),
            "Using an ephemeral master key: stored tenant secrets will be unrecoverable after restart"
        );
        Self::build(key, true)
    }

    fn build(master_key: MasterKey, ephemeral: bool) -> Self {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(master_key.bytes.expose_secret()));
        Self {
            cipher,
            key_id: master_key.key_id(),
            fingerprint: master_key.fingerprint(),
            ephemeral,
        }
    }

    /// Fingerprint of the master key in use
    pub fn key_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether this store runs on a throwaway key
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Seal a secret into a self-describing blob
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecretStoreError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| SecretStoreError::Encryption)?;

        let mut blob = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&self.key_id);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(blob)
    }

    /// Open a blob produced by [`SecretStore::encrypt`]
    ///
    /// Either the full plaintext is returned or an error; the AEAD tag is
    /// checked before any plaintext is released.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if blob.len() < HEADER_LEN + TAG_LEN {
            return Err(DecryptionError::Malformed);
        }

        let (header, ciphertext) = blob.split_at(HEADER_LEN);
        let version = header[0];
        if version != BLOB_VERSION {
            return Err(DecryptionError::UnsupportedVersion(version));
        }

        let key_id = &header[1..1 + KEY_ID_LEN];
        if key_id != self.key_id.as_slice() {
            return Err(DecryptionError::KeyMismatch);
        }

        let nonce = Nonce::from_slice(&header[1 + KEY_ID_LEN..]);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| DecryptionError::IntegrityCheckFailed)
    }
}

impl std::fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStore")
            .field("key_fingerprint", &self.fingerprint)
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}
