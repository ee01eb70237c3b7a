//! Code origin port: where tenant code comes from on a cache miss.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TenantId;

/// Errors fetching tenant code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OriginError {
    /// The origin answered, but has no code for the tenant.
    #[error("no code deployed for {0}")]
    NotFound(String),

    /// The origin could not be reached or answered unusably.
    #[error("origin unavailable: {0}")]
    Unavailable(String),
}

/// Source of deployed tenant code.
#[async_trait]
pub trait CodeOrigin: Send + Sync {
    async fn fetch(&self, tenant: &TenantId) -> Result<String, OriginError>;
}
