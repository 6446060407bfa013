//! PostgreSQL storage backend.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::{StorageError, StorageResult, StorageType, UrlStorage};

/// Attempts for a write that lost a race on the `original_url` unique constraint.
const MAX_STORE_ATTEMPTS: usize = 3;

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Unavailable(format!("postgres: {}", e))
            }
            other => StorageError::Backend(format!("postgres: {}", other)),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StorageError::Backend(format!("migration failed: {}", e))
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// Durable storage in the `short_links` table.
///
/// `short_id` is the primary key and `original_url` is unique, so the table
/// itself enforces the one-to-one mapping. Replacing a stale mapping happens
/// inside one transaction.
pub struct PgStorage {
    pool: Arc<PgPool>,
}

impl PgStorage {
    /// Creates the storage on top of an existing connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if a migration fails.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Number of stored mappings.
    pub async fn count(&self) -> StorageResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM short_links")
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(count)
    }

    async fn try_store(&self, short_id: &str, original_url: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let replaced = sqlx::query(
            "DELETE FROM short_links WHERE original_url = $1 AND short_id <> $2",
        )
        .bind(original_url)
        .bind(short_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Does not see rows from uncommitted writers. The upsert below covers a
        // concurrent insert of the same id.
        let reassigned = sqlx::query(
            "DELETE FROM short_links WHERE short_id = $1 AND original_url <> $2",
        )
        .bind(short_id)
        .bind(original_url)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO short_links (short_id, original_url)
            VALUES ($1, $2)
            ON CONFLICT (short_id)
            DO UPDATE SET original_url = EXCLUDED.original_url, last_accessed = now()
            "#,
        )
        .bind(short_id)
        .bind(original_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if replaced > 0 {
            info!("Replaced previous short id for {} with {}", original_url, short_id);
        }
        if reassigned > 0 {
            info!("Short id {} reassigned to {}", short_id, original_url);
        }
        Ok(())
    }
}

#[async_trait]
impl UrlStorage for PgStorage {
    async fn find(&self, original_url: &str) -> StorageResult<String> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }

        let short_id = sqlx::query_scalar::<_, String>(
            "SELECT short_id FROM short_links WHERE original_url = $1",
        )
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await
        .inspect_err(|e| error!("Failed to query for existing URL: {}", e))?;

        match short_id {
            Some(id) => {
                debug!("Found existing short id {} for {}", id, original_url);
                Ok(id)
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn store_with_id(&self, short_id: &str, original_url: &str) -> StorageResult<()> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }
        if short_id.is_empty() {
            return Err(StorageError::empty_id());
        }

        let mut attempt = 1;
        loop {
            match self.try_store(short_id, original_url).await {
                Ok(()) => {
                    debug!("Stored {} -> {}", short_id, original_url);
                    return Ok(());
                }
                // A concurrent writer committed the same URL under another id
                // between our DELETE and upsert. Rerun so the later write wins.
                Err(e) if is_unique_violation(&e) && attempt < MAX_STORE_ATTEMPTS => {
                    warn!(
                        "Concurrent write for {} (attempt {}/{}), retrying",
                        original_url, attempt, MAX_STORE_ATTEMPTS
                    );
                    attempt += 1;
                }
                Err(e) => {
                    error!("Failed to store {} -> {}: {}", short_id, original_url, e);
                    return Err(e.into());
                }
            }
        }
    }

    async fn get(&self, short_id: &str) -> StorageResult<String> {
        let url = sqlx::query_scalar::<_, String>(
            r#"
            UPDATE short_links
            SET last_accessed = now()
            WHERE short_id = $1
            RETURNING original_url
            "#,
        )
        .bind(short_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .inspect_err(|e| error!("Failed to get URL for {}: {}", short_id, e))?;

        url.ok_or(StorageError::NotFound)
    }

    async fn close(&self) -> StorageResult<()> {
        if !self.pool.is_closed() {
            info!("Closing PostgreSQL connection pool");
            self.pool.close().await;
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await
            .is_ok()
    }

    fn kind(&self) -> StorageType {
        StorageType::Postgres
    }
}
