//! Express-style router for native middleware tenants.
//!
//! Routes are tried in registration order. Path patterns are `/`-separated;
//! a `:name` segment captures into `request.params` and a trailing `*`
//! matches any remainder. A request no route matches runs `next`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use classio_core::{
    HandlerError, MiddlewareFn, MiddlewareHandler, Next, NormalizedRequest, ResponseSink,
    TenantHandler,
};
use http::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Rest,
}

struct Route {
    method: Option<Method>,
    pattern: Vec<Segment>,
    handler: Arc<dyn MiddlewareHandler>,
}

impl Route {
    fn accepts(&self, method: &Method) -> bool {
        match &self.method {
            None => true,
            Some(expected) if expected == method => true,
            // GET routes answer HEAD as well.
            Some(expected) => *expected == Method::GET && *method == Method::HEAD,
        }
    }

    fn captures(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut parts = path.split('/').filter(|part| !part.is_empty());

        for segment in &self.pattern {
            match segment {
                Segment::Rest => return Some(params),
                Segment::Literal(literal) => {
                    if parts.next()? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), parts.next()?.to_string());
                }
            }
        }

        parts.next().is_none().then_some(params)
    }
}

fn parse_pattern(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part == "*" {
                Segment::Rest
            } else if let Some(name) = part.strip_prefix(':') {
                Segment::Param(name.to_string())
            } else {
                Segment::Literal(part.to_string())
            }
        })
        .collect()
}

/// A middleware handler built from method and path routes.
#[derive(Default)]
pub struct MiddlewareApp {
    routes: Vec<Route>,
}

macro_rules! method_route {
    ($($(#[$doc:meta])* $name:ident => $method:expr;)*) => {
        $(
            $(#[$doc])*
            #[must_use]
            pub fn $name<F, Fut>(self, path: &str, handler: F) -> Self
            where
                F: Fn(NormalizedRequest, ResponseSink, Next) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
            {
                self.route(Some($method), path, handler)
            }
        )*
    };
}

impl MiddlewareApp {
    pub fn new() -> Self {
        Self::default()
    }

    method_route! {
        /// Handle `GET` (and `HEAD`) requests for `path`.
        get => Method::GET;
        post => Method::POST;
        put => Method::PUT;
        patch => Method::PATCH;
        delete => Method::DELETE;
    }

    /// Handle every method for `path`.
    #[must_use]
    pub fn all<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(NormalizedRequest, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.route(None, path, handler)
    }

    fn route<F, Fut>(mut self, method: Option<Method>, path: &str, handler: F) -> Self
    where
        F: Fn(NormalizedRequest, ResponseSink, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: parse_pattern(path),
            handler: Arc::new(MiddlewareFn::new(handler)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Wrap the app as a tenant handler.
    pub fn into_handler(self) -> TenantHandler {
        TenantHandler::Middleware(Arc::new(self))
    }
}

#[async_trait]
impl MiddlewareHandler for MiddlewareApp {
    async fn handle(
        &self,
        mut request: NormalizedRequest,
        response: ResponseSink,
        next: Next,
    ) -> Result<(), HandlerError> {
        for route in &self.routes {
            if !route.accepts(&request.method) {
                continue;
            }
            if let Some(params) = route.captures(&request.path) {
                request.params = params;
                return route.handler.handle(request, response, next).await;
            }
        }

        next.run();
        Ok(())
    }
}
