//! Port definitions for the gateway's external collaborators.
//!
//! Ports use only domain types. Concrete backends (native registry,
//! subprocess isolate, HTTP origin) live in `classio-runtime`.

mod isolate;
mod origin;

pub use isolate::{Isolate, IsolateError};
pub use origin::{CodeOrigin, OriginError};
