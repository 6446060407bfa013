//! Redis backend tests. Need a Redis server at `REDIS_URL`
//! (default `redis://localhost:6379`):
//!
//! ```bash
//! cargo test --test redis_storage -- --ignored
//! ```
//!
//! Every test uses its own ids and URLs, but all share the `reverse_urls` hash.

use shortlink_core::domain::{StorageError, StorageType, UrlStorage};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use shortlink_core::infrastructure::cache::{REVERSE_URLS_KEY, RedisStorage, SHORT_ID_KEY_PREFIX};
use shortlink_core::utils::id_generator::{IdGenerator, SnowflakeGenerator};
use std::time::Duration;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn connect(ttl_seconds: u64) -> RedisStorage {
    RedisStorage::connect(&redis_url(), ttl_seconds).await.unwrap()
}

/// Plain connection for inspecting and tampering with keys.
async fn raw_connection() -> MultiplexedConnection {
    redis::Client::open(redis_url())
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap()
}

async fn has_reverse_entry(conn: &mut MultiplexedConnection, url: &str) -> bool {
    conn.hexists(REVERSE_URLS_KEY, url).await.unwrap()
}

/// Fresh ids, prefixed per test so parallel tests never share one.
fn unique_ids(prefix: &str, n: usize) -> Vec<String> {
    let generator = SnowflakeGenerator::new(1023);
    (0..n)
        .map(|_| format!("{}{}", prefix, generator.encode(generator.next_id().unwrap())))
        .collect()
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_store_then_get_and_find() {
    let storage = connect(60).await;
    let id = unique_ids("rt", 1).remove(0);
    let url = format!("https://example.com/{}", id);

    storage.store_with_id(&id, &url).await.unwrap();

    assert_eq!(storage.get(&id).await.unwrap(), url);
    assert_eq!(storage.find(&url).await.unwrap(), id);
    assert_eq!(storage.kind(), StorageType::Redis);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_replace_semantics() {
    let storage = connect(60).await;
    let [id1, id2]: [String; 2] = unique_ids("rp", 2).try_into().unwrap();
    let url = format!("https://example.com/replace/{}", id1);

    storage.store_with_id(&id1, &url).await.unwrap();
    storage.store_with_id(&id2, &url).await.unwrap();

    assert_eq!(storage.find(&url).await.unwrap(), id2);
    assert_eq!(storage.get(&id1).await, Err(StorageError::NotFound));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_expired_forward_key_cleans_reverse_entry() {
    let storage = connect(1).await;
    let id = unique_ids("ex", 1).remove(0);
    let url = format!("https://example.com/expiring/{}", id);

    storage.store_with_id(&id, &url).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    assert_eq!(storage.get(&id).await, Err(StorageError::NotFound));
    assert_eq!(storage.find(&url).await, Err(StorageError::NotFound));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_closed_storage_is_unavailable() {
    let storage = connect(60).await;

    storage.close().await.unwrap();
    storage.close().await.unwrap();

    assert!(!storage.health_check().await);
    assert!(matches!(
        storage.get("abc").await,
        Err(StorageError::Unavailable(_))
    ));
    assert_eq!(SHORT_ID_KEY_PREFIX, "url:");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_get_refreshes_ttl() {
    let storage = connect(2).await;
    let id = unique_ids("tt", 1).remove(0);
    let url = format!("https://example.com/refresh/{}", id);

    storage.store_with_id(&id, &url).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(storage.get(&id).await.unwrap(), url);

    // Past the original TTL, alive only because the read renewed it.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(storage.get(&id).await.unwrap(), url);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_empty_input_is_invalid() {
    let storage = connect(60).await;

    assert!(matches!(
        storage.store_with_id("abc", "").await,
        Err(StorageError::InvalidInput(_))
    ));
    assert!(matches!(
        storage.store_with_id("", "https://example.com").await,
        Err(StorageError::InvalidInput(_))
    ));
    assert!(matches!(
        storage.find("").await,
        Err(StorageError::InvalidInput(_))
    ));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_store_is_idempotent() {
    let storage = connect(60).await;
    let mut conn = raw_connection().await;
    let id = unique_ids("id", 1).remove(0);
    let url = format!("https://example.com/twice/{}", id);

    storage.store_with_id(&id, &url).await.unwrap();
    storage.store_with_id(&id, &url).await.unwrap();

    assert_eq!(storage.get(&id).await.unwrap(), url);
    assert_eq!(storage.find(&url).await.unwrap(), id);
    let ttl: i64 = conn
        .ttl(format!("{}{}", SHORT_ID_KEY_PREFIX, id))
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 60);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_reused_id_drops_old_reverse_entry() {
    let storage = connect(60).await;
    let mut conn = raw_connection().await;
    let id = unique_ids("ru", 1).remove(0);
    let old_url = format!("https://example.com/old/{}", id);
    let new_url = format!("https://example.com/new/{}", id);

    storage.store_with_id(&id, &old_url).await.unwrap();
    storage.store_with_id(&id, &new_url).await.unwrap();

    assert_eq!(storage.get(&id).await.unwrap(), new_url);
    assert_eq!(storage.find(&new_url).await.unwrap(), id);
    assert!(!has_reverse_entry(&mut conn, &old_url).await);
    assert_eq!(storage.find(&old_url).await, Err(StorageError::NotFound));
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_find_removes_reverse_entry_pointing_at_other_url() {
    let storage = connect(60).await;
    let mut conn = raw_connection().await;
    let id = unique_ids("mm", 1).remove(0);
    let url = format!("https://example.com/mine/{}", id);

    storage.store_with_id(&id, &url).await.unwrap();
    conn.set::<_, _, ()>(
        format!("{}{}", SHORT_ID_KEY_PREFIX, id),
        format!("https://example.com/theirs/{}", id),
    )
    .await
    .unwrap();

    assert_eq!(storage.find(&url).await, Err(StorageError::NotFound));
    assert!(!has_reverse_entry(&mut conn, &url).await);
}
