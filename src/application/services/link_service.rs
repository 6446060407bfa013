//! Link creation and resolution service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::entities::ShortLink;
use crate::domain::{StorageError, StorageResult, StorageType, UrlStorage};
use crate::error::AppError;
use crate::utils::id_generator::{IdGenerator, decode_base62, generate_short_id};
use crate::utils::url_validator::validate_url;

/// Fallback ids tried before giving up when the generator is unavailable.
const MAX_FALLBACK_ATTEMPTS: usize = 5;

/// Result of [`LinkService::shorten`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenOutcome {
    pub link: ShortLink,
    /// `false` when the URL already had a short id.
    pub created: bool,
}

/// Service for shortening and resolving URLs.
///
/// Validates input before touching storage, reuses the existing id of a URL that
/// was shortened before, and bounds every storage call with a deadline.
pub struct LinkService {
    storage: Arc<dyn UrlStorage>,
    generator: Arc<dyn IdGenerator>,
    base_url: String,
    storage_timeout: Duration,
}

impl LinkService {
    pub fn new(
        storage: Arc<dyn UrlStorage>,
        generator: Arc<dyn IdGenerator>,
        base_url: impl Into<String>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            generator,
            base_url: base_url.into(),
            storage_timeout,
        }
    }

    /// Returns the short link for `long_url`, creating one if needed.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if the URL is not an absolute HTTP(S) URL
    /// - [`AppError::Unavailable`] if storage is unreachable or times out
    /// - [`AppError::Internal`] on other storage failures
    pub async fn shorten(&self, long_url: &str) -> Result<ShortenOutcome, AppError> {
        let original_url = validate_url(long_url)?;

        match self
            .with_deadline("find", self.storage.find(&original_url))
            .await
        {
            Ok(short_id) => {
                debug!("Reusing short id {} for {}", short_id, original_url);
                return Ok(ShortenOutcome {
                    link: ShortLink::new(short_id, original_url),
                    created: false,
                });
            }
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let short_id = self.allocate_id().await?;

        self.with_deadline(
            "store_with_id",
            self.storage.store_with_id(&short_id, &original_url),
        )
        .await?;

        info!("Created short link {} -> {}", short_id, original_url);
        Ok(ShortenOutcome {
            link: ShortLink::new(short_id, original_url),
            created: true,
        })
    }

    /// Resolves a short id.
    ///
    /// Ids that cannot be base-62 encodings are rejected as not found without
    /// a storage round trip.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if no mapping exists
    /// - [`AppError::Unavailable`] if storage is unreachable or times out
    pub async fn expand(&self, short_id: &str) -> Result<ShortLink, AppError> {
        if decode_base62(short_id).is_none() {
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "short_id": short_id }),
            ));
        }

        let original_url = self
            .with_deadline("get", self.storage.get(short_id))
            .await
            .map_err(|e| match e {
                StorageError::NotFound => AppError::not_found(
                    "Short link not found",
                    json!({ "short_id": short_id }),
                ),
                other => other.into(),
            })?;

        Ok(ShortLink::new(short_id, original_url))
    }

    /// Public URL of `link` under the configured base URL.
    pub fn short_url(&self, link: &ShortLink) -> String {
        link.short_url(&self.base_url)
    }

    /// Whether storage can serve requests within the deadline.
    pub async fn health(&self) -> bool {
        tokio::time::timeout(self.storage_timeout, self.storage.health_check())
            .await
            .unwrap_or(false)
    }

    /// Backend serving this service.
    pub fn storage_kind(&self) -> StorageType {
        self.storage.kind()
    }

    /// Picks a new short id.
    ///
    /// Uses the generator when it works. Otherwise takes ids from
    /// [`generate_short_id`] and keeps the first one storage does not already
    /// know.
    async fn allocate_id(&self) -> Result<String, AppError> {
        match self.generator.next_id() {
            Ok(id) => return Ok(self.generator.encode(id)),
            Err(e) => warn!("Identifier generator unavailable: {}", e),
        }

        for attempt in 1..=MAX_FALLBACK_ATTEMPTS {
            let candidate = generate_short_id(self.generator.as_ref());

            match self.with_deadline("get", self.storage.get(&candidate)).await {
                Err(StorageError::NotFound) => return Ok(candidate),
                Ok(_) => warn!(
                    "Fallback id {} already taken (attempt {}/{})",
                    candidate, attempt, MAX_FALLBACK_ATTEMPTS
                ),
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::internal(
            "Failed to generate unique short id",
            json!({ "reason": "Too many collisions" }),
        ))
    }

    async fn with_deadline<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.storage_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Storage {} timed out after {}ms",
                    operation,
                    self.storage_timeout.as_millis()
                );
                Err(StorageError::Unavailable(format!(
                    "{} timed out after {}ms",
                    operation,
                    self.storage_timeout.as_millis()
                )))
            }
        }
    }
}
