//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short id to its original URL.
///
/// # Endpoint
///
/// `GET /{short_id}`
///
/// Lookups go through the configured storage; with combined storage a cache
/// miss is answered from PostgreSQL and written back to Redis.
///
/// # Errors
///
/// Returns 404 Not Found if the short id doesn't exist and 503 if storage is
/// unreachable.
pub async fn redirect_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let link = state.link_service.expand(&short_id).await?;

    debug!("Redirecting {} -> {}", link.short_id, link.original_url);
    metrics::counter!("shortlink_redirects_total").increment(1);

    Ok(Redirect::temporary(&link.original_url))
}
