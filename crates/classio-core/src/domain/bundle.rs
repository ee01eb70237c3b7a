//! Tenant code bundles and their manifest header.
//!
//! A bundle's first non-blank line declares the handler it exports:
//!
//! ```text
//! #!classio kind=middleware runtime=process interpreter=python3
//! ...source...
//! ```
//!
//! Keys:
//!
//! | key           | values                  | default   |
//! |---------------|-------------------------|-----------|
//! | `kind`        | `direct`, `middleware`  | required  |
//! | `runtime`     | `process`, `native`     | `process` |
//! | `entry`       | registered handler name | required for `native` |
//! | `interpreter` | program to run source   | backend default |

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::handler::HandlerKind;

/// Marker that opens the manifest line.
pub const MANIFEST_PREFIX: &str = "#!classio";

/// Errors raised while reading a bundle manifest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("No handler exported. Declare one with a `{MANIFEST_PREFIX} kind=...` header")]
    MissingManifest,

    #[error("manifest does not declare a handler kind")]
    MissingKind,

    #[error("unknown handler kind `{0}`")]
    UnknownKind(String),

    #[error("unknown runtime `{0}`")]
    UnknownRuntime(String),

    #[error("malformed manifest token `{0}`")]
    InvalidToken(String),

    #[error("native bundles must name an `entry`")]
    MissingEntry,
}

/// Backend that hosts the bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    /// Source runs in a child process under an interpreter.
    #[default]
    Process,
    /// Handler compiled into the gateway and looked up by entry name.
    Native,
}

impl RuntimeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Native => "native",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(Self::Process),
            "native" => Ok(Self::Native),
            other => Err(BundleError::UnknownRuntime(other.to_string())),
        }
    }
}

impl FromStr for HandlerKind {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "middleware" => Ok(Self::Middleware),
            other => Err(BundleError::UnknownKind(other.to_string())),
        }
    }
}

/// Parsed manifest header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleManifest {
    pub kind: HandlerKind,
    pub runtime: RuntimeKind,
    pub entry: Option<String>,
    pub interpreter: Option<String>,
}

impl BundleManifest {
    fn from_tokens(tokens: &str) -> Result<Self, BundleError> {
        let mut kind = None;
        let mut runtime = RuntimeKind::default();
        let mut entry = None;
        let mut interpreter = None;

        for token in tokens.split_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                return Err(BundleError::InvalidToken(token.to_string()));
            };
            if value.is_empty() {
                return Err(BundleError::InvalidToken(token.to_string()));
            }
            match key {
                "kind" => kind = Some(value.parse::<HandlerKind>()?),
                "runtime" => runtime = value.parse()?,
                "entry" => entry = Some(value.to_string()),
                "interpreter" => interpreter = Some(value.to_string()),
                _ => return Err(BundleError::InvalidToken(token.to_string())),
            }
        }

        let kind = kind.ok_or(BundleError::MissingKind)?;
        if runtime == RuntimeKind::Native && entry.is_none() {
            return Err(BundleError::MissingEntry);
        }

        Ok(Self {
            kind,
            runtime,
            entry,
            interpreter,
        })
    }
}

/// A tenant code blob split into manifest and source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub manifest: BundleManifest,
    /// Everything after the manifest line.
    pub source: String,
}

impl Bundle {
    /// Parse a raw code blob.
    pub fn parse(code: &str) -> Result<Self, BundleError> {
        let mut offset = 0;

        for line in code.split_inclusive('\n') {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                offset += line.len();
                continue;
            }

            let tokens = trimmed
                .strip_prefix(MANIFEST_PREFIX)
                .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
                .ok_or(BundleError::MissingManifest)?;

            let manifest = BundleManifest::from_tokens(tokens)?;
            let source = code[offset + line.len()..].to_string();
            return Ok(Self { manifest, source });
        }

        Err(BundleError::MissingManifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_process_bundle() {
        let bundle =
            Bundle::parse("#!classio kind=direct interpreter=python3\nprint('hi')\n").unwrap();
        assert_eq!(bundle.manifest.kind, HandlerKind::Direct);
        assert_eq!(bundle.manifest.runtime, RuntimeKind::Process);
        assert_eq!(bundle.manifest.interpreter.as_deref(), Some("python3"));
        assert_eq!(bundle.source, "print('hi')\n");
    }

    #[test]
    fn skips_leading_blank_lines() {
        let bundle = Bundle::parse("\n\n  #!classio kind=middleware runtime=native entry=app\n")
            .unwrap();
        assert_eq!(bundle.manifest.kind, HandlerKind::Middleware);
        assert_eq!(bundle.manifest.entry.as_deref(), Some("app"));
        assert!(bundle.source.is_empty());
    }

    #[test]
    fn missing_header_means_no_handler() {
        assert_eq!(
            Bundle::parse("const handler = () => {}").unwrap_err(),
            BundleError::MissingManifest
        );
        assert_eq!(Bundle::parse("").unwrap_err(), BundleError::MissingManifest);
        assert_eq!(
            Bundle::parse("#!classiox kind=direct").unwrap_err(),
            BundleError::MissingManifest
        );
    }

    #[test]
    fn rejects_bad_manifests() {
        assert_eq!(
            Bundle::parse("#!classio runtime=process").unwrap_err(),
            BundleError::MissingKind
        );
        assert_eq!(
            Bundle::parse("#!classio kind=lambda").unwrap_err(),
            BundleError::UnknownKind("lambda".to_string())
        );
        assert_eq!(
            Bundle::parse("#!classio kind=direct runtime=wasm").unwrap_err(),
            BundleError::UnknownRuntime("wasm".to_string())
        );
        assert_eq!(
            Bundle::parse("#!classio kind=direct runtime=native").unwrap_err(),
            BundleError::MissingEntry
        );
        assert_eq!(
            Bundle::parse("#!classio kind=direct verbose").unwrap_err(),
            BundleError::InvalidToken("verbose".to_string())
        );
    }
}
