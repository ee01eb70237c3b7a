//! Core of the classio tenant execution gateway.
//!
//! Requests addressed by subdomain are mapped to a tenant's deployed code,
//! which is loaded through an [`Isolate`] and invoked under a deadline.
//! Tenants export either a [`DirectHandler`] (request in, response out) or a
//! [`MiddlewareHandler`] (request, [`ResponseSink`] and [`Next`]); the
//! adapter module invokes both uniformly.
//!
//! This crate has no HTTP server or process code. Backends live in
//! `classio-runtime`, the HTTP surface in `classio-axum`.

#![deny(unused_crate_dependencies)]

pub mod adapter;
pub mod contracts;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod settings;

pub use adapter::{
    Next, Payload, ResponseSink, SinkState, invoke_direct, invoke_middleware, request_host,
    translate_request,
};
pub use contracts::{InvalidateRequest, InvalidateResponse};
pub use domain::{
    Bundle, BundleError, BundleManifest, DirectFn, DirectHandler, HandlerError, HandlerKind,
    Headers, MiddlewareFn, MiddlewareHandler, NormalizedRequest, NormalizedResponse, RequestBody,
    RuntimeKind, TenantHandler, TenantId, resolve_tenant,
};
pub use error::GatewayError;
pub use ports::{CodeOrigin, Isolate, IsolateError, OriginError};
pub use services::{CodeCache, ExecutionGateway, TenantDispatcher};
pub use settings::{
    DEFAULT_EXECUTION_TIMEOUT_MS, DEFAULT_INTERPRETER, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_ORIGIN_URL, DEFAULT_RUNTIME_PORT,
};
