//! Check command handler.
//!
//! Parses a bundle locally so a tenant can validate its manifest before
//! uploading.

use std::path::Path;

use anyhow::{Context, Result};
use classio_core::{Bundle, RuntimeKind};
use tracing::debug;

/// Read and parse the bundle at `file_path`, printing the declared handler.
pub async fn execute(file_path: &str) -> Result<()> {
    let bundle = inspect(Path::new(file_path)).await?;
    debug!(path = file_path, source_bytes = bundle.source.len(), "bundle parsed");
    println!("{}", describe(&bundle));
    Ok(())
}

async fn inspect(path: &Path) -> Result<Bundle> {
    let code = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Bundle::parse(&code).with_context(|| format!("invalid bundle {}", path.display()))
}

fn describe(bundle: &Bundle) -> String {
    let manifest = &bundle.manifest;
    let mut fields = vec![
        format!("kind={}", manifest.kind),
        format!("runtime={}", manifest.runtime),
    ];
    if let Some(entry) = &manifest.entry {
        fields.push(format!("entry={entry}"));
    }
    if manifest.runtime == RuntimeKind::Process
        && let Some(interpreter) = &manifest.interpreter
    {
        fields.push(format!("interpreter={interpreter}"));
    }
    fields.join(" ")
}
