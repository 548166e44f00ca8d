//! Database layer
//!
//! This module handles the durable tenant record store:
//! - Enterprise records keyed by API key
//! - Retired API keys of deleted enterprises

pub mod tenant_repository;
pub mod tenant_store;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{Pool, Sqlite};

use crate::config::DatabaseConfig;

pub use tenant_repository::SqliteTenantStore;
pub use tenant_store::{DuplicateField, StoreError, TenantAdminStore, TenantStore};

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .with_context(|| format!("Failed to connect to database: {}", config.url))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Check that the database answers queries
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}
