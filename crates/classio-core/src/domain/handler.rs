//! Tenant handler conventions.
//!
//! A tenant exports exactly one of two conventions:
//!
//! - [`DirectHandler`]: one request in, one response out.
//! - [`MiddlewareHandler`]: receives the request, a mutable [`ResponseSink`]
//!   and a [`Next`] continuation. Its output is observed only through the sink.
//!
//! [`TenantHandler`] is the tagged variant an isolate returns at load time.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::request::NormalizedRequest;
use super::response::NormalizedResponse;
use crate::adapter::{Next, ResponseSink};

/// An error raised by tenant code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler failed with a tenant-authored message.
    #[error("{0}")]
    Failed(String),

    /// A direct handler produced something that is not a response.
    #[error("Handler must return a Response")]
    MalformedResponse,
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Single-argument convention: request in, response out.
#[async_trait]
pub trait DirectHandler: Send + Sync {
    async fn call(&self, request: NormalizedRequest) -> Result<NormalizedResponse, HandlerError>;
}

/// Callback convention: request, response sink and `next` continuation.
///
/// Returning `Ok(())` does not complete the response; only a terminal
/// operation on the sink (or `next`) does.
#[async_trait]
pub trait MiddlewareHandler: Send + Sync {
    async fn handle(
        &self,
        request: NormalizedRequest,
        response: ResponseSink,
        next: Next,
    ) -> Result<(), HandlerError>;
}

/// Declared handler convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Direct,
    Middleware,
}

impl HandlerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Middleware => "middleware",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded tenant handler, tagged with its convention.
#[derive(Clone)]
pub enum TenantHandler {
    Direct(Arc<dyn DirectHandler>),
    Middleware(Arc<dyn MiddlewareHandler>),
}

impl TenantHandler {
    /// Wrap an async closure as a direct handler.
    pub fn direct<F, Fut>(f: F) -> Self
    where
        F: Fn(NormalizedRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NormalizedResponse, HandlerError>> + Send + 'static,
    {
        Self::Direct(Arc::new(DirectFn(f)))
    }

    /// Wrap an async closure as a middleware handler.
    pub fn middleware<F, Fut>(f: F) -> Self
    where
        F: Fn(NormalizedRequest, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self::Middleware(Arc::new(MiddlewareFn(f)))
    }

    pub const fn kind(&self) -> HandlerKind {
        match self {
            Self::Direct(_) => HandlerKind::Direct,
            Self::Middleware(_) => HandlerKind::Middleware,
        }
    }
}

impl fmt::Debug for TenantHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TenantHandler").field(&self.kind()).finish()
    }
}

/// Adapts an async closure into a [`DirectHandler`].
pub struct DirectFn<F>(F);

impl<F> DirectFn<F> {
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> DirectHandler for DirectFn<F>
where
    F: Fn(NormalizedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<NormalizedResponse, HandlerError>> + Send + 'static,
{
    async fn call(&self, request: NormalizedRequest) -> Result<NormalizedResponse, HandlerError> {
        (self.0)(request).await
    }
}

/// Adapts an async closure into a [`MiddlewareHandler`].
pub struct MiddlewareFn<F>(F);

impl<F> MiddlewareFn<F> {
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> MiddlewareHandler for MiddlewareFn<F>
where
    F: Fn(NormalizedRequest, ResponseSink, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(
        &self,
        request: NormalizedRequest,
        response: ResponseSink,
        next: Next,
    ) -> Result<(), HandlerError> {
        (self.0)(request, response, next).await
    }
}
