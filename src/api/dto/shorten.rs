//! DTOs for link shortening endpoint.

use crate::error::ErrorInfo;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to shorten one or more URLs.
///
/// At most 100 URLs per request. Each URL is validated on its own while the
/// batch is processed, so one bad entry does not reject the others.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(length(min = 1, max = 100, message = "Provide between 1 and 100 URLs"))]
    pub urls: Vec<UrlItem>,
}

/// Individual URL to be shortened.
#[derive(Debug, Serialize, Deserialize)]
pub struct UrlItem {
    pub url: String,
}

/// Response containing batch processing results.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub summary: BatchSummary,
    pub items: Vec<ShortenResultItem>,
}

/// Individual result for a URL in the batch.
///
/// Untagged: success items carry `short_id`, failed items carry `error`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ShortenResultItem {
    Success {
        long_url: String,
        short_id: String,
        short_url: String,
        /// `false` when the URL had been shortened before.
        created: bool,
    },
    Error {
        long_url: String,
        error: ErrorInfo,
    },
}

/// Summary statistics for batch processing.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}
