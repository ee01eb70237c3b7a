//! Route definitions and router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use tower_http::trace::TraceLayer;

use crate::bootstrap::GatewayContext;
use crate::handlers;
use crate::state::AppState;

/// Build the gateway router.
///
/// `POST /invalidate` is the only control route. Every other method and path,
/// including non-POST `/invalidate`, is dispatched to the tenant.
pub fn create_router(ctx: GatewayContext) -> Router {
    let state: AppState = Arc::new(ctx);

    Router::new()
        .route(
            "/invalidate",
            post(handlers::invalidate::invalidate).fallback(handlers::dispatch::dispatch),
        )
        .fallback(handlers::dispatch::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
