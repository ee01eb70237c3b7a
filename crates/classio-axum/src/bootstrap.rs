//! Axum server bootstrap - the composition root.
//!
//! This is the only place where the cache, origin, isolates and gateway are
//! wired together.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use classio_core::settings::{
    DEFAULT_EXECUTION_TIMEOUT_MS, DEFAULT_INTERPRETER, DEFAULT_MAX_BODY_BYTES, DEFAULT_ORIGIN_URL,
    DEFAULT_RUNTIME_PORT,
};
use classio_core::{CodeCache, CodeOrigin, ExecutionGateway, Isolate, TenantDispatcher};
use classio_runtime::{HttpOrigin, NativeIsolate, ProcessIsolate, RuntimeIsolate};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::create_router;

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port for the HTTP server.
    pub port: u16,
    /// Base URL of the code origin.
    pub origin_url: String,
    /// Deadline for one tenant invocation.
    pub execution_timeout: Duration,
    /// Interpreter for process bundles that do not name one.
    pub interpreter: String,
    /// Largest request body forwarded to a tenant.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ServerConfig {
    /// Create config with the default settings.
    pub fn with_defaults() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_RUNTIME_PORT,
            origin_url: DEFAULT_ORIGIN_URL.to_string(),
            execution_timeout: Duration::from_millis(DEFAULT_EXECUTION_TIMEOUT_MS),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_origin_url(mut self, url: impl Into<String>) -> Self {
        self.origin_url = url.into();
        self
    }

    #[must_use]
    pub const fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    #[must_use]
    pub const fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything the HTTP handlers need.
pub struct GatewayContext {
    pub dispatcher: TenantDispatcher,
    pub max_body_bytes: usize,
}

/// Wire the gateway against the HTTP origin and the native/process isolates.
pub fn bootstrap(config: &ServerConfig, native: NativeIsolate) -> Result<GatewayContext> {
    let origin = HttpOrigin::new(&config.origin_url)?;

    info!(
        origin = %config.origin_url,
        interpreter = %config.interpreter,
        timeout_ms = config.execution_timeout.as_millis(),
        native_entries = ?native.entries(),
        "gateway bootstrap"
    );

    let isolate = RuntimeIsolate::new(native, ProcessIsolate::new(config.interpreter.clone()));
    Ok(bootstrap_with(config, Arc::new(origin), Arc::new(isolate)))
}

/// Wire the gateway against explicit origin and isolate implementations.
pub fn bootstrap_with(
    config: &ServerConfig,
    origin: Arc<dyn CodeOrigin>,
    isolate: Arc<dyn Isolate>,
) -> GatewayContext {
    let cache = Arc::new(CodeCache::new());
    let gateway = ExecutionGateway::new(isolate, config.execution_timeout);

    GatewayContext {
        dispatcher: TenantDispatcher::new(cache, origin, gateway),
        max_body_bytes: config.max_body_bytes,
    }
}

/// Serve on a bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, ctx: GatewayContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("classio gateway listening on http://{addr}");

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("classio gateway shut down");
    Ok(())
}

/// Bootstrap, bind and serve until ctrl-c.
pub async fn start_server(config: ServerConfig, native: NativeIsolate) -> Result<()> {
    let ctx = bootstrap(&config, native)?;
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    serve(listener, ctx, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
