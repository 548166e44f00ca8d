//! Enterprise repository backed by SQLite

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::tenant_store::{
    DuplicateField, StoreError, StoreResult, TenantAdminStore, TenantStore,
};
use crate::models::Enterprise;

#[derive(Debug, sqlx::FromRow)]
struct EnterpriseRow {
    id: String,
    name: String,
    api_key: String,
    encrypted_secret: Vec<u8>,
    is_active: bool,
    wecom_corp_id: String,
    encrypted_wecom_secret: Vec<u8>,
    created_at: String,
}

const SELECT_ENTERPRISE: &str = r#"
    SELECT id, name, api_key, encrypted_secret, is_active,
           wecom_corp_id, encrypted_wecom_secret, created_at
    FROM enterprises
"#;

/// Tenant record store over the `enterprises` table
///
/// Every call goes to the database; nothing is cached, so deactivation and
/// deletion apply to the very next lookup.
#[derive(Clone)]
pub struct SqliteTenantStore {
    pool: SqlitePool,
}

impl SqliteTenantStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn is_retired(&self, tx: &mut sqlx::SqliteConnection, api_key: &str) -> StoreResult<bool> {
        let retired: Option<(String,)> =
            sqlx::query_as("SELECT api_key FROM retired_api_keys WHERE api_key = ?")
                .bind(api_key)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to check retired api keys")?;
        Ok(retired.is_some())
    }
}

#[async_trait]
impl TenantStore for SqliteTenantStore {
    async fn find_by_api_key(&self, api_key: &str) -> StoreResult<Option<Enterprise>> {
        let row = sqlx::query_as::<_, EnterpriseRow>(&format!(
            "{} WHERE api_key = ?",
            SELECT_ENTERPRISE
        ))
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up enterprise by api key")?;

        row.map(row_to_enterprise).transpose()
    }

    async fn insert(&self, enterprise: &Enterprise) -> StoreResult<Enterprise> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        if self.is_retired(&mut tx, &enterprise.api_key).await? {
            return Err(StoreError::Duplicate(DuplicateField::ApiKey));
        }

        sqlx::query(
            r#"
            INSERT INTO enterprises (id, name, api_key, encrypted_secret, is_active,
                                     wecom_corp_id, encrypted_wecom_secret, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(enterprise.id.to_string())
        .bind(&enterprise.name)
        .bind(&enterprise.api_key)
        .bind(&enterprise.encrypted_secret)
        .bind(enterprise.is_active)
        .bind(&enterprise.wecom_corp_id)
        .bind(&enterprise.encrypted_wecom_secret)
        .bind(enterprise.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        tx.commit().await.context("Failed to commit enterprise")?;

        Ok(enterprise.clone())
    }
}

#[async_trait]
impl TenantAdminStore for SqliteTenantStore {
    async fn list(&self) -> StoreResult<Vec<Enterprise>> {
        let rows = sqlx::query_as::<_, EnterpriseRow>(&format!(
            "{} ORDER BY name",
            SELECT_ENTERPRISE
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list enterprises")?;

        rows.into_iter().map(row_to_enterprise).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Enterprise>> {
        let row = sqlx::query_as::<_, EnterpriseRow>(&format!("{} WHERE id = ?", SELECT_ENTERPRISE))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get enterprise")?;

        row.map(row_to_enterprise).transpose()
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE enterprises SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update enterprise status")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let api_key: Option<(String,)> =
            sqlx::query_as("SELECT api_key FROM enterprises WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to fetch enterprise for deletion")?;

        let Some((api_key,)) = api_key else {
            return Ok(false);
        };

        sqlx::query(
            "INSERT OR IGNORE INTO retired_api_keys (api_key, enterprise_id, retired_at) VALUES (?, ?, ?)",
        )
        .bind(&api_key)
        .bind(id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to retire api key")?;

        sqlx::query("DELETE FROM enterprises WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete enterprise")?;

        tx.commit().await.context("Failed to commit enterprise deletion")?;

        Ok(true)
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        let message = db_err.message();
        if message.contains("UNIQUE constraint failed") {
            if message.contains("enterprises.name") {
                return StoreError::Duplicate(DuplicateField::Name);
            }
            if message.contains("enterprises.api_key") {
                return StoreError::Duplicate(DuplicateField::ApiKey);
            }
        }
    }
    StoreError::Backend(anyhow::Error::new(err).context("Failed to insert enterprise"))
}

fn row_to_enterprise(row: EnterpriseRow) -> StoreResult<Enterprise> {
    Ok(Enterprise {
        id: Uuid::parse_str(&row.id).context("Invalid enterprise id")?,
        name: row.name,
        api_key: row.api_key,
        encrypted_secret: row.encrypted_secret,
        is_active: row.is_active,
        wecom_corp_id: row.wecom_corp_id,
        encrypted_wecom_secret: row.encrypted_wecom_secret,
        created_at: parse_db_timestamp(&row.created_at)?,
    })
}

fn parse_db_timestamp(ts: &str) -> StoreResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Invalid timestamp in enterprises table: {}", ts))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}
