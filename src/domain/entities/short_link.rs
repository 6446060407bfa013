//! ShortLink entity: the unit of storage.

use serde::Serialize;

/// A mapping between a short identifier and the URL it resolves to.
///
/// `created_at` / `last_accessed` exist only in the PostgreSQL table and are
/// not carried here; nothing in the lookup path reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortLink {
    pub short_id: String,
    pub original_url: String,
}

impl ShortLink {
    /// Creates a new ShortLink.
    pub fn new(short_id: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            short_id: short_id.into(),
            original_url: original_url.into(),
        }
    }

    /// Builds the public short URL by appending the id to `base_url`.
    ///
    /// A missing trailing slash on `base_url` is tolerated.
    pub fn short_url(&self, base_url: &str) -> String {
        if base_url.ends_with('/') {
            format!("{}{}", base_url, self.short_id)
        } else {
            format!("{}/{}", base_url, self.short_id)
        }
    }
}
