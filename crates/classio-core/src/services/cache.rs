//! Code cache - tenant id to deployed code.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// In-process map of tenant id to code blob.
///
/// Entries have no TTL. They are created on the first successful origin
/// fetch and removed only by [`CodeCache::invalidate`]. Concurrent misses for
/// one tenant are not coalesced.
#[derive(Debug, Default)]
pub struct CodeCache {
    entries: RwLock<HashMap<String, Arc<str>>>,
}

impl CodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant: &str) -> Option<Arc<str>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant)
            .cloned()
    }

    pub fn set(&self, tenant: &str, code: impl Into<Arc<str>>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant.to_string(), code.into());
    }

    /// Remove a tenant's entry. Returns whether one existed.
    pub fn invalidate(&self, tenant: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tenant)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
