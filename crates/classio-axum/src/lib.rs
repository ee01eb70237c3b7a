//! Axum HTTP surface for the classio gateway.
//!
//! `POST /invalidate` evicts a tenant's cached code; every other request is
//! dispatched to the tenant named by the host's first label.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Dev-dependencies used only by the integration tests
#[cfg(test)]
use async_trait as _;
#[cfg(test)]
use http_body_util as _;
#[cfg(test)]
use tower as _;

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use bootstrap::{GatewayContext, ServerConfig, bootstrap, bootstrap_with, serve, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
