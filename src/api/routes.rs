//! API route configuration.

use crate::api::handlers::{expand_handler, shorten_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// JSON API routes, nested under `/api`.
///
/// # Endpoints
///
/// - `POST /shorten`             - Create short links (batch-capable)
/// - `GET  /expand/{short_id}`   - Resolve a short id without redirecting
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/expand/{short_id}", get(expand_handler))
}
