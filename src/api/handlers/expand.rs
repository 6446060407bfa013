//! Handler for the expand endpoint.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::expand::ExpandResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns the original URL of a short id without redirecting.
///
/// `GET /api/expand/{short_id}`; 404 if the id is unknown.
pub async fn expand_handler(
    Path(short_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExpandResponse>, AppError> {
    let link = state.link_service.expand(&short_id).await?;
    Ok(Json(link.into()))
}
