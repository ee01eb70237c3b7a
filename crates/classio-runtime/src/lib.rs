//! Isolate backends and the code origin for the classio gateway.
//!
//! - [`NativeIsolate`]: handlers compiled into the binary, looked up by entry.
//! - [`MiddlewareApp`]: an express-style router to build native middleware
//!   tenants.
//! - [`ProcessIsolate`]: bundle sources run under an interpreter in a child
//!   process.
//! - [`RuntimeIsolate`]: routes each bundle to one of the above.
//! - [`builtin_isolate`]: the native handlers shipped with the binary.
//! - [`HttpOrigin`]: fetches tenant code from the deployment API.

#![deny(unsafe_code)]

mod app;
mod builtin;
mod isolate;
mod native;
mod origin;
pub mod process;

pub use app::MiddlewareApp;
pub use builtin::{ECHO_ENTRY, HELLO_ENTRY, builtin_isolate};
pub use isolate::RuntimeIsolate;
pub use native::NativeIsolate;
pub use origin::HttpOrigin;
pub use process::{MAX_REPLY_BYTES, ProcessIsolate, TENANT_ENV};
