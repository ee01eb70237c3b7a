//! Cache invalidation control endpoint.

use axum::Json;
use axum::extract::State;
use bytes::Bytes;
use classio_core::InvalidateResponse;

use crate::error::HttpError;
use crate::state::AppState;

/// `POST /invalidate` with `{"subdomain": "<tenant>"}`.
///
/// The body is read raw so a malformed payload maps to the gateway's own
/// validation error rather than axum's JSON rejection.
pub async fn invalidate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<InvalidateResponse>, HttpError> {
    Ok(Json(state.dispatcher.invalidate(&body)?))
}
