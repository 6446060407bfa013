//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{short_id}` - Redirect to the original URL
//! - `GET  /health`     - Storage health check
//! - `/api/*`           - JSON API
//!
//! # Middleware (outermost first)
//!
//! - **Request id** - `x-request-id` assigned if missing
//! - **Tracing** - one span per request, tagged with the request id
//! - **Request id propagation** - id echoed on the response
//! - **Panic catching** - handler panics become `500` JSON errors
//! - **Path normalization** - trailing slashes trimmed before routing

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::{panic, request_id, tracing};
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Routes and middleware, without path normalization.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/{short_id}", get(redirect_handler))
        .nest("/api", api::routes::api_routes())
        .with_state(state)
        .layer(panic::layer())
        .layer(request_id::propagate_layer())
        .layer(tracing::layer())
        .layer(request_id::set_layer())
}

/// Constructs the application router with all routes and middleware.
///
/// Normalization wraps the router so it runs before route matching.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}
