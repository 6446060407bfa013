//! Storage contract shared by every backend.

use crate::domain::storage_type::StorageType;
use async_trait::async_trait;

/// Errors returned by [`UrlStorage`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No mapping exists for the requested key.
    #[error("short link not found")]
    NotFound,

    /// The caller passed an empty or malformed argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Connection, transport or deadline failure. Retryable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Returns true for errors worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub(crate) fn empty_url() -> Self {
        Self::InvalidInput("original URL must not be empty".to_string())
    }

    pub(crate) fn empty_id() -> Self {
        Self::InvalidInput("short id must not be empty".to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Bidirectional short id <-> original URL store.
///
/// Every backend keeps both directions consistent: a URL maps to at most one
/// short id and a short id maps to at most one URL. Writing a mapping that
/// conflicts with an existing one in either direction replaces the stale entry.
///
/// # Implementations
///
/// - [`crate::infrastructure::memory::MemoryStorage`] - process-local maps
/// - [`crate::infrastructure::cache::RedisStorage`] - Redis with TTL
/// - [`crate::infrastructure::persistence::PgStorage`] - PostgreSQL
/// - [`crate::infrastructure::combined::CombinedStorage`] - Redis in front of PostgreSQL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlStorage: Send + Sync {
    /// Reverse lookup: finds the short id currently assigned to `original_url`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidInput`] if `original_url` is empty
    /// - [`StorageError::NotFound`] if the URL has no short id
    async fn find(&self, original_url: &str) -> StorageResult<String>;

    /// Stores the mapping `short_id <-> original_url`.
    ///
    /// Idempotent for identical arguments. If `original_url` already maps to a
    /// different id, that old id stops resolving. If `short_id` already maps to a
    /// different URL, that URL's reverse entry is dropped.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidInput`] if either argument is empty.
    async fn store_with_id(&self, short_id: &str, original_url: &str) -> StorageResult<()>;

    /// Forward lookup: resolves `short_id` to its original URL.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] if the id is unknown.
    async fn get(&self, short_id: &str) -> StorageResult<String>;

    /// Releases connections held by the backend. Safe to call more than once.
    async fn close(&self) -> StorageResult<()>;

    /// Checks whether the backend can currently serve requests.
    async fn health_check(&self) -> bool;

    /// The backend variant, for logs and health output.
    fn kind(&self) -> StorageType;
}
