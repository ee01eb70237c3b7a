//! Composite isolate routing each bundle to the backend its manifest names.

use async_trait::async_trait;
use classio_core::{Bundle, Isolate, IsolateError, RuntimeKind, TenantHandler, TenantId};

use crate::native::NativeIsolate;
use crate::process::ProcessIsolate;

/// The gateway's isolate: native handlers by entry name, everything else as
/// a child process.
#[derive(Debug, Clone, Default)]
pub struct RuntimeIsolate {
    native: NativeIsolate,
    process: ProcessIsolate,
}

impl RuntimeIsolate {
    pub const fn new(native: NativeIsolate, process: ProcessIsolate) -> Self {
        Self { native, process }
    }

    pub const fn native(&self) -> &NativeIsolate {
        &self.native
    }

    pub const fn process(&self) -> &ProcessIsolate {
        &self.process
    }
}

#[async_trait]
impl Isolate for RuntimeIsolate {
    async fn load(&self, tenant: &TenantId, bundle: &Bundle) -> Result<TenantHandler, IsolateError> {
        match bundle.manifest.runtime {
            RuntimeKind::Native => self.native.load(tenant, bundle).await,
            RuntimeKind::Process => self.process.load(tenant, bundle).await,
        }
    }
}
