//! Builds the storage backend selected by `STORAGE_TYPE`.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};

use crate::config::{Config, mask_connection_string};
use crate::domain::{StorageResult, StorageType, UrlStorage};
use crate::infrastructure::cache::RedisStorage;
use crate::infrastructure::combined::CombinedStorage;
use crate::infrastructure::memory::MemoryStorage;
use crate::infrastructure::persistence::PgStorage;

/// Connects the backend named by `config.storage_type`.
///
/// Each network backend is retried with exponential backoff up to
/// `storage_connect_retries` attempts. For the combined backend a Redis handle
/// that is already open is closed again if PostgreSQL cannot be reached.
///
/// # Errors
///
/// Returns an error if a required connection cannot be established or the
/// database migrations fail.
pub async fn connect_storage(config: &Config) -> Result<Arc<dyn UrlStorage>> {
    let storage: Arc<dyn UrlStorage> = match config.storage_type {
        StorageType::Memory => Arc::new(MemoryStorage::new()),
        StorageType::Redis => Arc::new(connect_redis(config).await?),
        StorageType::Postgres => Arc::new(connect_postgres(config).await?),
        StorageType::Combined => {
            let redis = connect_redis(config).await?;
            let postgres = match connect_postgres(config).await {
                Ok(pg) => pg,
                Err(e) => {
                    if let Err(close_err) = redis.close().await {
                        warn!("Failed to close Redis after startup error: {}", close_err);
                    }
                    return Err(e);
                }
            };
            Arc::new(CombinedStorage::new(Arc::new(redis), Arc::new(postgres)))
        }
    };

    info!("Storage ready: {}", storage.kind());
    Ok(storage)
}

async fn connect_redis(config: &Config) -> Result<RedisStorage> {
    let url = config.redis_url.clone();
    let ttl = config.cache_ttl_seconds;

    with_retries("Redis", config.storage_connect_retries, || {
        RedisStorage::connect(&url, ttl)
    })
    .await
    .with_context(|| {
        format!(
            "Failed to connect to Redis at {}",
            mask_connection_string(&config.redis_url)
        )
    })
}

async fn connect_postgres(config: &Config) -> Result<PgStorage> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for PostgreSQL storage")?;

    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime));

    let pool = with_retries("PostgreSQL", config.storage_connect_retries, || {
        let options = options.clone();
        async move { options.connect(database_url).await.map_err(Into::into) }
    })
    .await
    .with_context(|| {
        format!(
            "Failed to connect to database at {}",
            mask_connection_string(database_url)
        )
    })?;
    info!("Connected to database");

    let storage = PgStorage::new(Arc::new(pool));
    if let Err(e) = storage.migrate().await {
        if let Err(close_err) = storage.close().await {
            warn!("Failed to close database pool: {}", close_err);
        }
        return Err(e).context("Failed to run database migrations");
    }

    Ok(storage)
}

/// Runs `connect` until it succeeds or `attempts` tries are used up.
async fn with_retries<T, F, Fut>(name: &str, attempts: usize, mut connect: F) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let strategy = ExponentialBackoff::from_millis(10)
        .factor(10)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(attempts.saturating_sub(1));

    Retry::spawn(strategy, || {
        let attempt = connect();
        async move {
            attempt
                .await
                .inspect_err(|e| warn!("{} connection attempt failed: {}", name, e))
        }
    })
    .await
}
