//! Shared application state type.

use std::sync::Arc;

use crate::bootstrap::GatewayContext;

/// State shared by all handlers.
pub type AppState = Arc<GatewayContext>;
