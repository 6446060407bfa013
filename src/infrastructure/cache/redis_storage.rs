//! Redis-backed storage with expiring forward keys.

use crate::domain::{StorageError, StorageResult, StorageType, UrlStorage};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Prefix of the forward keys: `url:<short_id>` holds the original URL.
pub const SHORT_ID_KEY_PREFIX: &str = "url:";

/// Hash mapping original URL -> short id. Never expires.
pub const REVERSE_URLS_KEY: &str = "reverse_urls";

/// TTL used when the configured one is zero.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

impl From<RedisError> for StorageError {
    fn from(e: RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
        {
            StorageError::Unavailable(format!("redis: {}", e))
        } else {
            StorageError::Backend(format!("redis: {}", e))
        }
    }
}

/// Storage on top of Redis.
///
/// Forward keys (`url:<id>`) carry a TTL that every successful [`get`] renews.
/// The reverse index ([`REVERSE_URLS_KEY`]) does not expire, so it can point at a
/// forward key that is already gone; [`find`] detects that, deletes the dangling
/// field and reports `NotFound`.
///
/// [`get`]: UrlStorage::get
/// [`find`]: UrlStorage::find
pub struct RedisStorage {
    connection: RwLock<Option<ConnectionManager>>,
    ttl_seconds: u64,
}

impl RedisStorage {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// A `ttl_seconds` of zero selects [`DEFAULT_TTL_SECONDS`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the URL is invalid, the connection
    /// cannot be established, or PING fails.
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> StorageResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            StorageError::Unavailable(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            StorageError::Unavailable(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut ping_conn = manager.clone();
        ping_conn
            .ping::<()>()
            .await
            .map_err(|e| StorageError::Unavailable(format!("Redis PING failed: {}", e)))?;

        let ttl_seconds = if ttl_seconds == 0 {
            info!("Using default TTL for Redis cache: {}s", DEFAULT_TTL_SECONDS);
            DEFAULT_TTL_SECONDS
        } else {
            ttl_seconds
        };

        info!("✓ Connected to Redis (TTL: {}s)", ttl_seconds);

        Ok(Self {
            connection: RwLock::new(Some(manager)),
            ttl_seconds,
        })
    }

    /// TTL applied to forward keys.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    fn forward_key(short_id: &str) -> String {
        format!("{}{}", SHORT_ID_KEY_PREFIX, short_id)
    }

    /// Clones the shared connection manager, or fails if closed.
    fn conn(&self) -> StorageResult<ConnectionManager> {
        self.connection
            .read()
            .map_err(|_| StorageError::Backend("redis connection lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| StorageError::Unavailable("redis connection closed".to_string()))
    }
}

#[async_trait]
impl UrlStorage for RedisStorage {
    async fn find(&self, original_url: &str) -> StorageResult<String> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }

        let mut conn = self.conn()?;

        let short_id: Option<String> = conn.hget(REVERSE_URLS_KEY, original_url).await?;
        let Some(short_id) = short_id else {
            debug!("Cache MISS (reverse): {}", original_url);
            return Err(StorageError::NotFound);
        };

        let forward: Option<String> = conn.get(Self::forward_key(&short_id)).await?;
        if forward.as_deref() == Some(original_url) {
            debug!("Cache HIT (reverse): {} -> {}", original_url, short_id);
            return Ok(short_id);
        }

        warn!(
            "Stale reverse mapping {} -> {}, removing",
            original_url, short_id
        );
        if let Err(e) = conn
            .hdel::<_, _, ()>(REVERSE_URLS_KEY, original_url)
            .await
        {
            warn!("Failed to remove stale reverse mapping: {}", e);
        }

        Err(StorageError::NotFound)
    }

    async fn store_with_id(&self, short_id: &str, original_url: &str) -> StorageResult<()> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }
        if short_id.is_empty() {
            return Err(StorageError::empty_id());
        }

        let mut conn = self.conn()?;
        let key = Self::forward_key(short_id);

        let previous_id: Option<String> = conn.hget(REVERSE_URLS_KEY, original_url).await?;
        let previous_url: Option<String> = conn.get(&key).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();

        if let Some(old_id) = previous_id.as_deref().filter(|old| *old != short_id) {
            debug!("Replacing short id {} with {} for {}", old_id, short_id, original_url);
            pipe.del(Self::forward_key(old_id)).ignore();
        }
        if let Some(old_url) = previous_url.as_deref().filter(|old| *old != original_url) {
            debug!("Short id {} moves from {} to {}", short_id, old_url, original_url);
            pipe.hdel(REVERSE_URLS_KEY, old_url).ignore();
        }

        pipe.set_ex(&key, original_url, self.ttl_seconds).ignore();
        pipe.hset(REVERSE_URLS_KEY, original_url, short_id).ignore();

        pipe.query_async::<()>(&mut conn).await?;

        debug!(
            "Cache SET: {} -> {} (TTL: {}s)",
            short_id, original_url, self.ttl_seconds
        );
        Ok(())
    }

    async fn get(&self, short_id: &str) -> StorageResult<String> {
        let mut conn = self.conn()?;
        let key = Self::forward_key(short_id);

        let url: Option<String> = conn.get(&key).await?;
        let Some(url) = url else {
            debug!("Cache MISS: {}", short_id);
            return Err(StorageError::NotFound);
        };

        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        if let Err(e) = conn.expire::<_, ()>(&key, ttl).await {
            warn!("Failed to refresh TTL for {}: {}", short_id, e);
        }

        debug!("Cache HIT: {} -> {}", short_id, url);
        Ok(url)
    }

    async fn close(&self) -> StorageResult<()> {
        let mut connection = self
            .connection
            .write()
            .map_err(|_| StorageError::Backend("redis connection lock poisoned".to_string()))?;

        if connection.take().is_some() {
            info!("Closing Redis connection");
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        match self.conn() {
            Ok(mut conn) => conn.ping::<()>().await.is_ok(),
            Err(_) => false,
        }
    }

    fn kind(&self) -> StorageType {
        StorageType::Redis
    }
}
