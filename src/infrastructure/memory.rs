//! In-process storage backend.

use crate::domain::{StorageError, StorageResult, StorageType, UrlStorage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Maps {
    /// short_id -> original_url
    urls: HashMap<String, String>,
    /// original_url -> short_id
    reverse_urls: HashMap<String, String>,
}

/// Storage backed by two hash maps behind one lock.
///
/// Both directions are updated under the same write guard, so readers never
/// observe a forward entry without its reverse entry. Nothing is persisted and
/// nothing expires.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    maps: RwLock<Maps>,
}

impl MemoryStorage {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        info!("Initializing in-memory storage");
        Self::default()
    }

    /// Number of stored mappings.
    pub fn len(&self) -> usize {
        self.maps.read().map(|m| m.urls.len()).unwrap_or(0)
    }

    /// Whether no mapping is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("memory storage lock poisoned".to_string())
}

#[async_trait]
impl UrlStorage for MemoryStorage {
    async fn find(&self, original_url: &str) -> StorageResult<String> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }

        let maps = self.maps.read().map_err(poisoned)?;
        maps.reverse_urls
            .get(original_url)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn store_with_id(&self, short_id: &str, original_url: &str) -> StorageResult<()> {
        if original_url.is_empty() {
            return Err(StorageError::empty_url());
        }
        if short_id.is_empty() {
            return Err(StorageError::empty_id());
        }

        let mut maps = self.maps.write().map_err(poisoned)?;

        if let Some(existing_id) = maps.reverse_urls.get(original_url).cloned()
            && existing_id != short_id
        {
            info!(
                "URL already has short id {}, replacing with {}: {}",
                existing_id, short_id, original_url
            );
            maps.urls.remove(&existing_id);
        }

        if let Some(existing_url) = maps.urls.get(short_id).cloned()
            && existing_url != original_url
        {
            info!(
                "Short id {} reassigned from {} to {}",
                short_id, existing_url, original_url
            );
            maps.reverse_urls.remove(&existing_url);
        }

        maps.urls
            .insert(short_id.to_string(), original_url.to_string());
        maps.reverse_urls
            .insert(original_url.to_string(), short_id.to_string());

        debug!("Stored in memory: {} -> {}", short_id, original_url);
        Ok(())
    }

    async fn get(&self, short_id: &str) -> StorageResult<String> {
        let maps = self.maps.read().map_err(poisoned)?;
        maps.urls.get(short_id).cloned().ok_or(StorageError::NotFound)
    }

    async fn close(&self) -> StorageResult<()> {
        info!("Closing memory storage (no-op)");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.maps.is_poisoned()
    }

    fn kind(&self) -> StorageType {
        StorageType::Memory
    }
}
