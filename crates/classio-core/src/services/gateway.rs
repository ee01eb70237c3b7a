//! Execution gateway - load, classify, invoke, dispose.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::adapter::{invoke_direct, invoke_middleware};
use crate::domain::{Bundle, NormalizedRequest, NormalizedResponse, TenantHandler, TenantId};
use crate::error::GatewayError;
use crate::ports::Isolate;

/// Runs tenant code through an [`Isolate`] under a fixed deadline.
pub struct ExecutionGateway {
    isolate: Arc<dyn Isolate>,
    deadline: Duration,
}

impl ExecutionGateway {
    pub fn new(isolate: Arc<dyn Isolate>, deadline: Duration) -> Self {
        Self { isolate, deadline }
    }

    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Execute `code` for `tenant` against `request`.
    ///
    /// Every failure of the tenant code (bad manifest, load failure, handler
    /// error, panic, deadline) is returned as [`GatewayError::Execution`] or
    /// [`GatewayError::Timeout`]; nothing propagates past this call.
    pub async fn execute(
        &self,
        tenant: &TenantId,
        code: &str,
        request: NormalizedRequest,
    ) -> Result<NormalizedResponse, GatewayError> {
        let bundle = Bundle::parse(code).inspect_err(|err| {
            warn!(tenant = %tenant, error = %err, "rejected tenant bundle");
        })?;
        let declared = bundle.manifest.kind;

        let handler = self.isolate.load(tenant, &bundle).await.inspect_err(|err| {
            warn!(tenant = %tenant, error = %err, "failed to load tenant handler");
        })?;

        if handler.kind() != declared {
            let loaded = handler.kind();
            self.isolate.dispose(handler).await;
            warn!(tenant = %tenant, %declared, %loaded, "handler kind mismatch");
            return Err(GatewayError::execution(format!(
                "Handler is not invocable: declared {declared} but found {loaded}"
            )));
        }

        let started = Instant::now();
        let result = match &handler {
            TenantHandler::Direct(direct) => {
                invoke_direct(Arc::clone(direct), request, self.deadline).await
            }
            TenantHandler::Middleware(middleware) => {
                invoke_middleware(Arc::clone(middleware), request, self.deadline).await
            }
        };
        self.isolate.dispose(handler).await;

        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Ok(response) => {
                debug!(tenant = %tenant, kind = %declared, status = response.status, elapsed_ms, "tenant handler completed");
            }
            Err(GatewayError::Timeout) => {
                warn!(tenant = %tenant, kind = %declared, elapsed_ms, "tenant handler timed out");
            }
            Err(err) => {
                warn!(tenant = %tenant, kind = %declared, error = %err, elapsed_ms, "tenant handler failed");
            }
        }

        result
    }
}
