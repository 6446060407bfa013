//! Redis backend.
//!
//! Used on its own (`STORAGE_TYPE=redis`) or as the cache tier of
//! [`CombinedStorage`](crate::infrastructure::combined::CombinedStorage).

mod redis_storage;

pub use redis_storage::{DEFAULT_TTL_SECONDS, REVERSE_URLS_KEY, RedisStorage, SHORT_ID_KEY_PREFIX};
