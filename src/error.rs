use std::{fmt, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;


/// Where a value being decoded came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Values already carried by the target struct or the registry.
    Defaults,

    /// The `config/local.yml` override file.
    LocalOverride,

    /// The process environment.
    Environment,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Defaults => f.write_str("struct defaults"),
            SourceKind::LocalOverride => f.write_str("local override file"),
            SourceKind::Environment => f.write_str("process environment"),
        }
    }
}


/// Errors produced while resolving configuration or generating artifacts.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfxError {
    /// A raw value could not be decoded into its field.
    /// The raw value itself is never included, as it may be a secret.
    #[error("failed to decode {key} from the {origin}: {reason}")]
    #[diagnostic(code(confx::decode))]
    Decode {
        key: String,
        origin: SourceKind,
        reason: String,
    },

    /// A field that is not flagged `optional` has no value after every source was applied.
    #[error("required value {key} is missing")]
    #[diagnostic(
        code(confx::missing),
        help("set it in the environment, in config/local.yml, or give the field a default")
    )]
    Missing { key: String },

    #[error("failed to create directory {}", path.display())]
    #[diagnostic(code(confx::create_directory))]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write artifact {}", path.display())]
    #[diagnostic(code(confx::write_artifact))]
    WriteArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
