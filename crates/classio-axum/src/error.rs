//! HTTP error type and the mapping from gateway errors.
//!
//! Control-endpoint failures answer with a JSON body; tenant-path failures
//! answer with plain text.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use classio_core::GatewayError;
use serde_json::json;
use thiserror::Error;

/// Axum-facing error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Malformed control request.
    #[error("Invalid request")]
    InvalidRequest,

    /// The host does not name a tenant.
    #[error("Specify a subdomain")]
    NoTenant,

    /// No code could be resolved for the tenant.
    #[error("App not found: {0}")]
    NotFound(String),

    /// Tenant code failed or timed out.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The request body exceeded the configured limit.
    #[error("Payload too large")]
    PayloadTooLarge,
}

impl HttpError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::NoTenant => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        match self {
            Self::InvalidRequest => (status, Json(json!({ "error": message }))).into_response(),
            _ => (status, message).into_response(),
        }
    }
}

impl From<GatewayError> for HttpError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(_) => Self::InvalidRequest,
            GatewayError::NoTenant => Self::NoTenant,
            GatewayError::NotFound(tenant) => Self::NotFound(tenant),
            GatewayError::Execution(message) => Self::Execution(message),
            GatewayError::Timeout => Self::Execution(GatewayError::Timeout.to_string()),
        }
    }
}
