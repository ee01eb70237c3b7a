//! Gateway error taxonomy.
//!
//! Adapters map these to their own surface (HTTP status codes, CLI exit
//! codes). Messages are safe to show to the caller.

use thiserror::Error;

use crate::domain::{BundleError, HandlerError};
use crate::ports::IsolateError;

/// Errors produced by the dispatch pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// A control request failed validation.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The request host does not name a tenant.
    #[error("Specify a subdomain")]
    NoTenant,

    /// No code could be resolved for the tenant.
    #[error("App not found: {0}")]
    NotFound(String),

    /// Tenant code failed to load or run.
    #[error("{0}")]
    Execution(String),

    /// Tenant code did not complete before the deadline.
    #[error("handler timeout")]
    Timeout,
}

impl GatewayError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::NoTenant => 400,
            Self::NotFound(_) => 404,
            Self::Execution(_) | Self::Timeout => 500,
        }
    }

    /// Whether this error came from running tenant code.
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_) | Self::Timeout)
    }
}

impl From<BundleError> for GatewayError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::MissingManifest => Self::Execution("No handler exported".to_string()),
            other => Self::Execution(format!("Handler is not invocable: {other}")),
        }
    }
}

impl From<IsolateError> for GatewayError {
    fn from(err: IsolateError) -> Self {
        Self::Execution(err.to_string())
    }
}

impl From<HandlerError> for GatewayError {
    fn from(err: HandlerError) -> Self {
        Self::Execution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(GatewayError::Validation("x".into()).status_code(), 400);
        assert_eq!(GatewayError::NoTenant.status_code(), 400);
        assert_eq!(GatewayError::NotFound("acme".into()).status_code(), 404);
        assert_eq!(GatewayError::Timeout.status_code(), 500);
        assert_eq!(GatewayError::execution("boom").status_code(), 500);
    }

    #[test]
    fn bundle_errors_become_execution_errors() {
        assert_eq!(
            GatewayError::from(BundleError::MissingManifest),
            GatewayError::execution("No handler exported")
        );
        let err = GatewayError::from(BundleError::UnknownKind("lambda".into()));
        assert!(err.to_string().starts_with("Handler is not invocable"));
    }

    #[test]
    fn handler_messages_are_surfaced() {
        let err = GatewayError::from(HandlerError::failed("db down"));
        assert_eq!(err.to_string(), "db down");
        assert_eq!(GatewayError::Timeout.to_string(), "handler timeout");
    }
}
