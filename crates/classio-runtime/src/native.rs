//! Native isolate: tenant handlers compiled into the gateway binary.
//!
//! Bundles select a handler by name with `runtime=native entry=<name>`.

use std::collections::HashMap;

use async_trait::async_trait;
use classio_core::{Bundle, Isolate, IsolateError, TenantHandler, TenantId};
use tracing::debug;

/// Registry of handlers keyed by entry name.
#[derive(Debug, Clone, Default)]
pub struct NativeIsolate {
    handlers: HashMap<String, TenantHandler>,
}

impl NativeIsolate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `entry`, replacing any previous one.
    pub fn register(&mut self, entry: impl Into<String>, handler: TenantHandler) {
        self.handlers.insert(entry.into(), handler);
    }

    #[must_use]
    pub fn with_handler(mut self, entry: impl Into<String>, handler: TenantHandler) -> Self {
        self.register(entry, handler);
        self
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.handlers.contains_key(entry)
    }

    /// Registered entry names, sorted.
    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        entries.sort_unstable();
        entries
    }
}

#[async_trait]
impl Isolate for NativeIsolate {
    async fn load(&self, tenant: &TenantId, bundle: &Bundle) -> Result<TenantHandler, IsolateError> {
        let entry = bundle
            .manifest
            .entry
            .as_deref()
            .ok_or_else(|| IsolateError::NoHandler("bundle names no native entry".to_string()))?;

        let handler = self.handlers.get(entry).cloned().ok_or_else(|| {
            IsolateError::NoHandler(format!("no native handler registered as `{entry}`"))
        })?;

        debug!(tenant = %tenant, entry, kind = %handler.kind(), "loaded native handler");
        Ok(handler)
    }
}
