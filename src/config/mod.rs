//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Master key sources for the secret store

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum length of the administrative bearer token
pub const MIN_ADMIN_TOKEN_LENGTH: usize = 32;

/// Minimum decoded length of the passphrase KDF salt
pub const MIN_KDF_SALT_LENGTH: usize = 16;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest request body accepted on signed routes (bytes)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix (default: "wecom-relay")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

/// Log line format
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/wecom-relay")
}

fn default_log_prefix() -> String {
    "wecom-relay".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Master key configuration for the secret store
///
/// Exactly one key source must be configured: either `master_key` (base64 of
/// 32 random bytes) or `master_passphrase` together with `kdf_salt`. Every
/// stored secret is bound to this key; changing it makes all existing
/// tenants unauthenticatable.
#[derive(Clone, Deserialize, Serialize, Default)]
pub struct SecretsConfig {
    /// Base64-encoded 32-byte master key
    #[serde(default)]
    pub master_key: Option<String>,
    /// Passphrase run through Argon2id to obtain the master key
    #[serde(default)]
    pub master_passphrase: Option<String>,
    /// Base64-encoded salt for the passphrase derivation
    #[serde(default)]
    pub kdf_salt: Option<String>,
    /// Generate a throwaway key when no source is configured (tests only)
    #[serde(default)]
    pub allow_ephemeral: bool,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .field(
                "master_passphrase",
                &self.master_passphrase.as_ref().map(|_| "[REDACTED]"),
            )
            .field("kdf_salt", &self.kdf_salt)
            .field("allow_ephemeral", &self.allow_ephemeral)
            .finish()
    }
}

/// Where the master key comes from, after validation
#[derive(Debug, Clone, PartialEq)]
pub enum MasterKeySource<'a> {
    Key(&'a str),
    Passphrase { passphrase: &'a str, salt: &'a str },
    Ephemeral,
}

impl SecretsConfig {
    /// Resolve the configured key source
    pub fn source(&self) -> Result<MasterKeySource<'_>> {
        match (
            self.master_key.as_deref(),
            self.master_passphrase.as_deref(),
            self.kdf_salt.as_deref(),
        ) {
            (Some(_), Some(_), _) => {
                anyhow::bail!("Configure either secrets.master_key or secrets.master_passphrase, not both")
            }
            (Some(key), None, _) => Ok(MasterKeySource::Key(key)),
            (None, Some(passphrase), Some(salt)) => {
                Ok(MasterKeySource::Passphrase { passphrase, salt })
            }
            (None, Some(_), None) => {
                anyhow::bail!("secrets.kdf_salt is required when secrets.master_passphrase is set")
            }
            (None, None, _) if self.allow_ephemeral => Ok(MasterKeySource::Ephemeral),
            (None, None, _) => anyhow::bail!(
                "No master key configured. Set secrets.master_key (see --generate-master-key) \
                 or secrets.master_passphrase; an ephemeral key requires secrets.allow_ephemeral"
            ),
        }
    }
}

/// Administrative API configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    /// Bearer token required on tenant administration routes
    pub token: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                max_body_bytes: default_max_body_bytes(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/wecom-relay.db".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            logging: LoggingConfig::default(),
            secrets: SecretsConfig::default(),
            // No usable default: the token must come from the file or the environment
            admin: AdminConfig {
                token: String::new(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("WECOM_RELAY_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                serde_norway::from_str::<AppConfig>(&contents)
                    .with_context(|| format!("Failed to parse config file: {:?}", path))?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/wecom-relay/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("wecom-relay/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("WECOM_RELAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("WECOM_RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WECOM_RELAY_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        // Secret sources are usually injected by the deployment, not the file
        if let Ok(key) = std::env::var("WECOM_RELAY_MASTER_KEY") {
            self.secrets.master_key = Some(key);
        }
        if let Ok(passphrase) = std::env::var("WECOM_RELAY_MASTER_PASSPHRASE") {
            self.secrets.master_passphrase = Some(passphrase);
        }
        if let Ok(salt) = std::env::var("WECOM_RELAY_KDF_SALT") {
            self.secrets.kdf_salt = Some(salt);
        }

        if let Ok(token) = std::env::var("WECOM_RELAY_ADMIN_TOKEN") {
            self.admin.token = token;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        let source = self.secrets.source()?;

        if self.admin.token.is_empty() {
            anyhow::bail!("admin.token is not set (WECOM_RELAY_ADMIN_TOKEN)");
        }

        if self.admin.token.len() < MIN_ADMIN_TOKEN_LENGTH {
            anyhow::bail!(
                "Admin token must be at least {} characters long",
                MIN_ADMIN_TOKEN_LENGTH
            );
        }

        if let MasterKeySource::Passphrase { salt, .. } = source {
            let decoded = BASE64
                .decode(salt)
                .context("secrets.kdf_salt is not valid base64")?;
            if decoded.len() < MIN_KDF_SALT_LENGTH {
                anyhow::bail!(
                    "secrets.kdf_salt must decode to at least {} bytes, got {}",
                    MIN_KDF_SALT_LENGTH,
                    decoded.len()
                );
            }
        }

        Ok(())
    }
}
