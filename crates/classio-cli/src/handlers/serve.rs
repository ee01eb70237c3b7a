//! Serve command handler.

use anyhow::Result;
use classio_runtime::builtin_isolate;

use crate::commands::ServeArgs;

/// Start the gateway with the built-in native handlers and run until ctrl-c.
pub async fn execute(args: &ServeArgs) -> Result<()> {
    let config = args.to_config();
    let native = builtin_isolate();

    println!("Starting classio gateway on {}", config.bind_addr());
    println!("Code origin: {}", config.origin_url);
    println!("Native entries: {}", native.entries().join(", "));

    classio_axum::start_server(config, native).await
}
