//! HTTP request handlers.
//!
//! Handlers are thin wrappers that delegate to the `TenantDispatcher`.

pub mod dispatch;
pub mod invalidate;
