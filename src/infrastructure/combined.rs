//! Cache in front of durable storage.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{StorageError, StorageResult, StorageType, UrlStorage};

/// Two-tier storage: a volatile cache consulted first and a durable store that
/// is the source of truth.
///
/// # Policy
///
/// - **Reads** (`find`, `get`): cache first. A miss or a cache error falls through
///   to the durable store; a durable hit is copied back into the cache on a best
///   effort basis.
/// - **Writes**: durable first and must succeed. The cache write that follows may
///   fail without failing the call.
/// - **Close**: both tiers are always closed; the durable error wins.
///
/// Cache failures are logged and counted, never returned. Durable failures are
/// always returned.
pub struct CombinedStorage {
    cache: Arc<dyn UrlStorage>,
    durable: Arc<dyn UrlStorage>,
}

impl CombinedStorage {
    /// Composes a cache tier and a durable tier.
    pub fn new(cache: Arc<dyn UrlStorage>, durable: Arc<dyn UrlStorage>) -> Self {
        Self { cache, durable }
    }

    /// Records a cache lookup failure other than a plain miss.
    fn cache_error(operation: &str, key: &str, e: &StorageError) {
        metrics::counter!("shortlink_cache_errors_total", "operation" => operation.to_string())
            .increment(1);
        warn!("Cache {} failed for {}: {}", operation, key, e);
    }

    /// Copies a mapping found in the durable store back into the cache.
    async fn backfill(&self, short_id: &str, original_url: &str) {
        if let Err(e) = self.cache.store_with_id(short_id, original_url).await {
            metrics::counter!("shortlink_cache_backfill_failures_total").increment(1);
            warn!("Failed to update cache for {}: {}", short_id, e);
        }
    }
}

#[async_trait]
impl UrlStorage for CombinedStorage {
    async fn find(&self, original_url: &str) -> StorageResult<String> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }

        match self.cache.find(original_url).await {
            Ok(short_id) => {
                metrics::counter!("shortlink_cache_hits_total").increment(1);
                return Ok(short_id);
            }
            Err(StorageError::NotFound) => {
                metrics::counter!("shortlink_cache_misses_total").increment(1);
            }
            Err(e) => Self::cache_error("find", original_url, &e),
        }

        let short_id = self.durable.find(original_url).await?;
        self.backfill(&short_id, original_url).await;

        Ok(short_id)
    }

    async fn store_with_id(&self, short_id: &str, original_url: &str) -> StorageResult<()> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }

        self.durable.store_with_id(short_id, original_url).await?;

        if let Err(e) = self.cache.store_with_id(short_id, original_url).await {
            metrics::counter!("shortlink_cache_errors_total", "operation" => "store")
                .increment(1);
            warn!("Failed to store {} in cache: {}", short_id, e);
        }

        Ok(())
    }

    async fn get(&self, short_id: &str) -> StorageResult<String> {
        match self.cache.get(short_id).await {
            Ok(url) => {
                metrics::counter!("shortlink_cache_hits_total").increment(1);
                return Ok(url);
            }
            Err(StorageError::NotFound) => {
                metrics::counter!("shortlink_cache_misses_total").increment(1);
                debug!("Cache MISS for {}, reading durable store", short_id);
            }
            Err(e) => Self::cache_error("get", short_id, &e),
        }

        let url = self.durable.get(short_id).await?;
        self.backfill(short_id, &url).await;

        Ok(url)
    }

    async fn close(&self) -> StorageResult<()> {
        let durable_result = self.durable.close().await;
        let cache_result = self.cache.close().await;

        if let Err(e) = &cache_result {
            warn!("Failed to close cache: {}", e);
        }

        durable_result.and(cache_result)
    }

    /// Healthy as long as the durable store is; a cache outage only degrades
    /// latency.
    async fn health_check(&self) -> bool {
        let cache_ok = self.cache.health_check().await;
        if !cache_ok {
            warn!("Cache health check failed, serving from durable store");
        }
        self.durable.health_check().await
    }

    fn kind(&self) -> StorageType {
        StorageType::Combined
    }
}
