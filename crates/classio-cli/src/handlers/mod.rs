//! Command handlers.
//!
//! Each handler exposes `pub async fn execute(...) -> Result<()>` and stays a
//! thin wrapper over the gateway crates.

pub mod check;
pub mod serve;
