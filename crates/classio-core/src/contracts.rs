//! Wire contracts for the gateway's control endpoint.

use serde::{Deserialize, Serialize};

/// Body of `POST /invalidate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateRequest {
    pub subdomain: String,
}

/// Reply to a successful invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub success: bool,
}

impl InvalidateResponse {
    pub const fn ok() -> Self {
        Self { success: true }
    }
}
