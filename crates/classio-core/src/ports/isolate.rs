//! Isolate port: turns a tenant bundle into an invocable handler.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Bundle, TenantHandler, TenantId};

/// Errors raised while loading a bundle into an isolate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IsolateError {
    /// The bundle exports nothing the backend can find.
    #[error("No handler exported: {0}")]
    NoHandler(String),

    /// The exported value exists but cannot be invoked.
    #[error("Handler is not invocable: {0}")]
    NotInvocable(String),

    /// The backend failed to prepare the isolate.
    #[error("Failed to load handler: {0}")]
    Load(String),
}

/// A sandbox backend for tenant code.
///
/// `load` is called once per invocation; the returned handler is handed back
/// to `dispose` after the invocation finishes, whatever its outcome.
#[async_trait]
pub trait Isolate: Send + Sync {
    /// Load `bundle` for `tenant` and return the handler it declares.
    async fn load(&self, tenant: &TenantId, bundle: &Bundle) -> Result<TenantHandler, IsolateError>;

    /// Release whatever `load` acquired for `handler`.
    async fn dispose(&self, handler: TenantHandler) {
        drop(handler);
    }
}
