//! Default runtime settings.
//!
//! Adapters layer their own configuration (CLI flags, environment) on top of
//! these values.

/// Port the gateway listens on.
pub const DEFAULT_RUNTIME_PORT: u16 = 3001;

/// Base URL of the code origin (`GET {origin}/code/{tenant}`).
pub const DEFAULT_ORIGIN_URL: &str = "http://localhost:3000";

/// Execution deadline for one tenant invocation, in milliseconds.
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 5000;

/// Interpreter used by the process backend when a bundle names none.
pub const DEFAULT_INTERPRETER: &str = "sh";

/// Largest request body the gateway will buffer.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
