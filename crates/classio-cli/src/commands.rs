//! Available subcommands.

use std::time::Duration;

use clap::{Args, Subcommand};
use classio_axum::ServerConfig;
use classio_core::settings::{
    DEFAULT_EXECUTION_TIMEOUT_MS, DEFAULT_INTERPRETER, DEFAULT_ORIGIN_URL, DEFAULT_RUNTIME_PORT,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway
    Serve(ServeArgs),

    /// Parse a bundle's manifest and report its handler
    Check {
        /// Path to the bundle file
        file_path: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "RUNTIME_PORT", default_value_t = DEFAULT_RUNTIME_PORT)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, env = "CLASSIO_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Base URL of the code origin
    #[arg(long, env = "API_URL", default_value = DEFAULT_ORIGIN_URL)]
    pub origin: String,

    /// Execution deadline in milliseconds
    #[arg(long = "timeout-ms", env = "SANDBOX_TIMEOUT", default_value_t = DEFAULT_EXECUTION_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Interpreter for process bundles
    #[arg(long, env = "CLASSIO_INTERPRETER", default_value = DEFAULT_INTERPRETER)]
    pub interpreter: String,
}

impl ServeArgs {
    pub fn to_config(&self) -> ServerConfig {
        ServerConfig::with_defaults()
            .with_host(self.host.clone())
            .with_port(self.port)
            .with_origin_url(self.origin.clone())
            .with_execution_timeout(Duration::from_millis(self.timeout_ms))
            .with_interpreter(self.interpreter.clone())
    }
}
