//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use classio_axum::{ServerConfig, bootstrap_with, create_router};
use classio_core::{
    CodeOrigin, HandlerError, NormalizedResponse, OriginError, ResponseSink, TenantHandler,
    TenantId,
};
use classio_runtime::{MiddlewareApp, NativeIsolate, ProcessIsolate, RuntimeIsolate};
use http_body_util::BodyExt;
use serde_json::json;

/// In-memory code origin that counts fetches.
#[derive(Default)]
pub struct FakeOrigin {
    code: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl FakeOrigin {
    pub fn with_code(mut self, tenant: &str, code: &str) -> Self {
        self.code.insert(tenant.to_string(), code.to_string());
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeOrigin for FakeOrigin {
    async fn fetch(&self, tenant: &TenantId) -> Result<String, OriginError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.code
            .get(tenant.as_str())
            .cloned()
            .ok_or_else(|| OriginError::NotFound(tenant.to_string()))
    }
}

/// Native handlers the fixture tenants point at.
pub fn native_isolate() -> NativeIsolate {
    NativeIsolate::new()
        .with_handler(
            "api",
            TenantHandler::direct(|_| async {
                Ok(NormalizedResponse::json(&json!({"message": "ok"})))
            }),
        )
        .with_handler(
            "site",
            MiddlewareApp::new()
                .get("/", |_, res: ResponseSink, _| async move {
                    res.send("Hello");
                    Ok(())
                })
                .into_handler(),
        )
        .with_handler(
            "hang",
            TenantHandler::middleware(|_, _, _| std::future::pending::<Result<(), HandlerError>>()),
        )
        .with_handler(
            "boom",
            TenantHandler::direct(|_| async { Err::<NormalizedResponse, _>(HandlerError::failed("boom")) }),
        )
}

/// Tenants served by the default fixture origin.
pub fn fixture_origin() -> FakeOrigin {
    FakeOrigin::default()
        .with_code("demo", "#!classio kind=direct runtime=native entry=api")
        .with_code("app", "#!classio kind=middleware runtime=native entry=site")
        .with_code("slow", "#!classio kind=middleware runtime=native entry=hang")
        .with_code("broken", "#!classio kind=direct runtime=native entry=boom")
        .with_code("blank", "console.log('no export')")
}

pub fn test_config() -> ServerConfig {
    ServerConfig::with_defaults().with_execution_timeout(Duration::from_millis(200))
}

/// Router over `origin` with the fixture isolates.
pub fn router_with(origin: Arc<FakeOrigin>) -> Router {
    let isolate = RuntimeIsolate::new(native_isolate(), ProcessIsolate::default());
    create_router(bootstrap_with(&test_config(), origin, Arc::new(isolate)))
}

pub fn request(method: &str, host: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", host)
        .body(body)
        .unwrap()
}

pub fn get(host: &str, uri: &str) -> Request<Body> {
    request("GET", host, uri, Body::empty())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
