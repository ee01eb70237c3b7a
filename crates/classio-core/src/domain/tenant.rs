//! Tenant identity and host-based resolution.

use std::fmt;

use crate::error::GatewayError;

/// Loopback host name that never addresses a tenant.
const LOOPBACK_LABEL: &str = "localhost";

/// Identifier of a tenant, taken from the first label of the request host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolve the tenant id from a `Host` value.
///
/// The first `.`-separated label is the tenant. A host with no usable label,
/// the bare loopback name, or a first label carrying a port (`localhost:3001`)
/// yields [`GatewayError::NoTenant`].
pub fn resolve_tenant(host: &str) -> Result<TenantId, GatewayError> {
    let label = host.trim().split('.').next().unwrap_or_default();

    if label.is_empty() || label.eq_ignore_ascii_case(LOOPBACK_LABEL) || label.contains(':') {
        return Err(GatewayError::NoTenant);
    }

    Ok(TenantId::new(label))
}
