//! DTO for the expand endpoint.

use serde::Serialize;

use crate::domain::entities::ShortLink;

#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub short_id: String,
    pub original_url: String,
}

impl From<ShortLink> for ExpandResponse {
    fn from(link: ShortLink) -> Self {
        Self {
            short_id: link.short_id,
            original_url: link.original_url,
        }
    }
}
