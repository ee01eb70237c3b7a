//! Tenant dispatcher - host resolution, cache-or-origin lookup and execution.

use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use tracing::{debug, info, warn};

use crate::adapter::{request_host, translate_request};
use crate::contracts::{InvalidateRequest, InvalidateResponse};
use crate::domain::{NormalizedResponse, TenantId, resolve_tenant};
use crate::error::GatewayError;
use crate::ports::CodeOrigin;
use crate::services::{CodeCache, ExecutionGateway};

/// Transport-neutral request pipeline.
///
/// The HTTP adapter hands every non-control request to [`dispatch`] and the
/// control body to [`invalidate`].
///
/// [`dispatch`]: TenantDispatcher::dispatch
/// [`invalidate`]: TenantDispatcher::invalidate
pub struct TenantDispatcher {
    cache: Arc<CodeCache>,
    origin: Arc<dyn CodeOrigin>,
    gateway: ExecutionGateway,
}

impl TenantDispatcher {
    pub fn new(cache: Arc<CodeCache>, origin: Arc<dyn CodeOrigin>, gateway: ExecutionGateway) -> Self {
        Self {
            cache,
            origin,
            gateway,
        }
    }

    pub fn cache(&self) -> &Arc<CodeCache> {
        &self.cache
    }

    pub const fn gateway(&self) -> &ExecutionGateway {
        &self.gateway
    }

    /// Run the tenant addressed by the request's host.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Result<NormalizedResponse, GatewayError> {
        let tenant = resolve_tenant(request_host(&request).unwrap_or_default())?;
        let code = self.resolve_code(&tenant).await?;
        let normalized = translate_request(request);
        self.gateway.execute(&tenant, &code, normalized).await
    }

    /// Cached code for `tenant`, fetching from the origin on a miss.
    ///
    /// Each call does one cache lookup and at most one origin fetch. A failed
    /// fetch leaves the cache untouched.
    pub async fn resolve_code(&self, tenant: &TenantId) -> Result<Arc<str>, GatewayError> {
        if let Some(code) = self.cache.get(tenant.as_str()) {
            debug!(tenant = %tenant, "code cache hit");
            return Ok(code);
        }

        debug!(tenant = %tenant, "code cache miss");
        match self.origin.fetch(tenant).await {
            Ok(code) => {
                let code: Arc<str> = code.into();
                self.cache.set(tenant.as_str(), Arc::clone(&code));
                Ok(code)
            }
            Err(err) => {
                warn!(tenant = %tenant, error = %err, "failed to fetch tenant code");
                Err(GatewayError::NotFound(tenant.to_string()))
            }
        }
    }

    /// Handle the body of `POST /invalidate`.
    pub fn invalidate(&self, body: &[u8]) -> Result<InvalidateResponse, GatewayError> {
        let request: InvalidateRequest =
            serde_json::from_slice(body).map_err(|err| GatewayError::Validation(err.to_string()))?;

        let existed = self.cache.invalidate(&request.subdomain);
        info!(tenant = %request.subdomain, existed, "invalidated tenant code");
        Ok(InvalidateResponse::ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use http::header::HOST;
    use serde_json::json;

    use super::*;
    use crate::adapter::ResponseSink;
    use crate::domain::{Bundle, NormalizedRequest, RuntimeKind, TenantHandler};
    use crate::ports::{Isolate, IsolateError, OriginError};

    /// Origin serving a fixed code map and counting fetches per tenant.
    #[derive(Default)]
    struct FakeOrigin {
        code: Mutex<HashMap<String, String>>,
        fetches: Mutex<HashMap<String, usize>>,
    }

    impl FakeOrigin {
        fn with(entries: &[(&str, &str)]) -> Arc<Self> {
            let origin = Self::default();
            for (tenant, code) in entries {
                origin.deploy(tenant, code);
            }
            Arc::new(origin)
        }

        fn deploy(&self, tenant: &str, code: &str) {
            self.code
                .lock()
                .unwrap()
                .insert(tenant.to_string(), code.to_string());
        }

        fn fetches(&self, tenant: &str) -> usize {
            self.fetches.lock().unwrap().get(tenant).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl CodeOrigin for FakeOrigin {
        async fn fetch(&self, tenant: &TenantId) -> Result<String, OriginError> {
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(tenant.to_string())
                .or_default() += 1;
            self.code
                .lock()
                .unwrap()
                .get(tenant.as_str())
                .cloned()
                .ok_or_else(|| OriginError::NotFound(tenant.to_string()))
        }
    }

    /// Native-style isolate: the manifest entry picks the handler.
    struct EntryIsolate;

    #[async_trait]
    impl Isolate for EntryIsolate {
        async fn load(
            &self,
            _tenant: &TenantId,
            bundle: &Bundle,
        ) -> Result<TenantHandler, IsolateError> {
            assert_eq!(bundle.manifest.runtime, RuntimeKind::Native);
            match bundle.manifest.entry.as_deref() {
                Some("api") => Ok(TenantHandler::direct(|req: NormalizedRequest| async move {
                    Ok(NormalizedResponse::json(&json!({"message": "ok", "path": req.path})))
                })),
                Some("hello") => Ok(TenantHandler::middleware(
                    |_, res: ResponseSink, _| async move {
                        res.send("Hello");
                        Ok(())
                    },
                )),
                other => Err(IsolateError::NoHandler(format!("{other:?}"))),
            }
        }
    }

    const DIRECT_API: &str = "#!classio kind=direct runtime=native entry=api\n";
    const HELLO_APP: &str = "#!classio kind=middleware runtime=native entry=hello\n";

    fn dispatcher(origin: Arc<FakeOrigin>) -> TenantDispatcher {
        TenantDispatcher::new(
            Arc::new(CodeCache::new()),
            origin,
            ExecutionGateway::new(Arc::new(EntryIsolate), Duration::from_millis(200)),
        )
    }

    fn get(host: &str, path: &str) -> Request<Bytes> {
        Request::builder()
            .uri(path)
            .header(HOST, host)
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn dispatches_direct_tenant() {
        let dispatcher = dispatcher(FakeOrigin::with(&[("demo", DIRECT_API)]));

        let response = dispatcher
            .dispatch(get("demo.example.com", "/api/test"))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&response.body).unwrap(),
            json!({"message": "ok", "path": "/api/test"})
        );
    }

    #[tokio::test]
    async fn dispatches_middleware_tenant() {
        let dispatcher = dispatcher(FakeOrigin::with(&[("app", HELLO_APP)]));

        let response = dispatcher.dispatch(get("app.example.com", "/")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), "Hello");
    }

    #[tokio::test]
    async fn caches_after_first_fetch() {
        let origin = FakeOrigin::with(&[("demo", DIRECT_API)]);
        let dispatcher = dispatcher(origin.clone());

        for _ in 0..3 {
            dispatcher.dispatch(get("demo.example.com", "/")).await.unwrap();
        }
        assert_eq!(origin.fetches("demo"), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_fresh_fetch() {
        let origin = FakeOrigin::with(&[("acme", DIRECT_API)]);
        let dispatcher = dispatcher(origin.clone());

        dispatcher.dispatch(get("acme.example.com", "/")).await.unwrap();
        origin.deploy("acme", HELLO_APP);

        let reply = dispatcher.invalidate(br#"{"subdomain":"acme"}"#).unwrap();
        assert!(reply.success);
        assert!(dispatcher.cache().get("acme").is_none());

        let response = dispatcher.dispatch(get("acme.example.com", "/")).await.unwrap();
        assert_eq!(response.body_text(), "Hello");
        assert_eq!(origin.fetches("acme"), 2);
    }

    #[tokio::test]
    async fn malformed_invalidate_is_validation_error() {
        let dispatcher = dispatcher(FakeOrigin::with(&[]));

        let bodies: [&[u8]; 3] = [b"not json", br#"{}"#, br#"{"subdomain":1}"#];
        for body in bodies {
            let err = dispatcher.invalidate(body).unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn loopback_host_has_no_tenant() {
        let dispatcher = dispatcher(FakeOrigin::with(&[]));

        let err = dispatcher.dispatch(get("localhost:3001", "/")).await.unwrap_err();
        assert_eq!(err, GatewayError::NoTenant);
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found_and_not_cached() {
        let origin = FakeOrigin::with(&[]);
        let dispatcher = dispatcher(origin.clone());

        let err = dispatcher.dispatch(get("ghost.example.com", "/")).await.unwrap_err();
        assert_eq!(err, GatewayError::NotFound("ghost".to_string()));
        assert_eq!(err.to_string(), "App not found: ghost");
        assert!(dispatcher.cache().is_empty());

        dispatcher.dispatch(get("ghost.example.com", "/")).await.unwrap_err();
        assert_eq!(origin.fetches("ghost"), 2);
    }
}
