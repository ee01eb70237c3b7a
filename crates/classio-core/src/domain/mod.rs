//! Domain types for the tenant execution gateway.
//!
//! These types are transport-neutral: they carry no axum, reqwest or process
//! details and are shared by every adapter.

mod bundle;
mod handler;
mod headers;
mod request;
mod response;
mod tenant;

pub use bundle::{Bundle, BundleError, BundleManifest, MANIFEST_PREFIX, RuntimeKind};
pub use handler::{
    DirectFn, DirectHandler, HandlerError, HandlerKind, MiddlewareFn, MiddlewareHandler,
    TenantHandler,
};
pub use headers::Headers;
pub use request::{NormalizedRequest, RequestBody};
pub use response::{JSON_CONTENT_TYPE, NormalizedResponse, TEXT_CONTENT_TYPE};
pub use tenant::{TenantId, resolve_tenant};
