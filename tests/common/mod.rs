#![allow(dead_code)]

use async_trait::async_trait;
use shortlink_core::application::services::LinkService;
use shortlink_core::domain::{StorageError, StorageResult, StorageType, UrlStorage};
use shortlink_core::infrastructure::MemoryStorage;
use shortlink_core::state::AppState;
use shortlink_core::utils::id_generator::SnowflakeGenerator;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub const BASE_URL: &str = "https://s.example/";

pub fn create_test_state(storage: Arc<dyn UrlStorage>) -> AppState {
    let link_service = LinkService::new(
        storage,
        Arc::new(SnowflakeGenerator::new(1)),
        BASE_URL,
        Duration::from_secs(2),
    );
    AppState::new(Arc::new(link_service))
}

pub fn memory_state() -> (AppState, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    (create_test_state(storage.clone()), storage)
}

/// In-memory storage that can be switched into an outage.
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemoryStorage,
    failing: AtomicBool,
}

impl FlakyStorage {
    pub fn failing() -> Self {
        let storage = Self::default();
        storage.set_failing(true);
        storage
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UrlStorage for FlakyStorage {
    async fn find(&self, original_url: &str) -> StorageResult<String> {
        self.check()?;
        self.inner.find(original_url).await
    }

    async fn store_with_id(&self, short_id: &str, original_url: &str) -> StorageResult<()> {
        self.check()?;
        self.inner.store_with_id(short_id, original_url).await
    }

    async fn get(&self, short_id: &str) -> StorageResult<String> {
        self.check()?;
        self.inner.get(short_id).await
    }

    async fn close(&self) -> StorageResult<()> {
        self.check()
    }

    async fn health_check(&self) -> bool {
        self.check().is_ok()
    }

    fn kind(&self) -> StorageType {
        StorageType::Redis
    }
}
