//! Handler for link shortening endpoint.

use axum::{Json, extract::State};
use validator::Validate;

use crate::api::dto::shorten::{BatchSummary, ShortenRequest, ShortenResponse, ShortenResultItem};
use crate::error::AppError;
use crate::state::AppState;

/// Creates short links for one or more URLs.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Batch Processing
///
/// Processes URLs independently. If one fails, others continue processing.
/// A URL that was shortened before gets its existing id back with
/// `"created": false`.
///
/// # Request Body
///
/// ```json
/// { "urls": [ { "url": "https://example.com" } ] }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "summary": { "total": 1, "successful": 1, "failed": 0 },
///   "items": [
///     {
///       "long_url": "https://example.com/",
///       "short_id": "6Yzk1XqLbX2",
///       "short_url": "http://localhost:3000/6Yzk1XqLbX2",
///       "created": true
///     }
///   ]
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the list is empty or too long.
/// Individual URL errors are returned in the response items array.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    payload.validate()?;

    let total = payload.urls.len();
    let mut results = Vec::with_capacity(total);
    let mut successful = 0;
    let mut failed = 0;

    for item in payload.urls {
        match state.link_service.shorten(&item.url).await {
            Ok(outcome) => {
                successful += 1;
                let short_url = state.link_service.short_url(&outcome.link);
                results.push(ShortenResultItem::Success {
                    long_url: outcome.link.original_url,
                    short_id: outcome.link.short_id,
                    short_url,
                    created: outcome.created,
                });
            }
            Err(err) => {
                failed += 1;
                results.push(ShortenResultItem::Error {
                    long_url: item.url,
                    error: err.to_error_info(),
                });
            }
        }
    }

    metrics::counter!("shortlink_shortened_total").increment(successful as u64);

    Ok(Json(ShortenResponse {
        summary: BatchSummary {
            total,
            successful,
            failed,
        },
        items: results,
    }))
}
