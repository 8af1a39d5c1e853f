use std::path::PathBuf;

use thiserror::Error;

/// Boxed parser/serializer error from one of the format crates.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while loading, mutating or persisting configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No schema file exists for the requested application.
    #[error("app schema not found: {0}")]
    AppNotFound(String),

    /// The application name cannot be mapped to a schema file.
    #[error("invalid app name: {0:?}")]
    InvalidAppName(String),

    /// The schema names a format this store cannot read or write.
    #[error("unsupported config format {format:?} for {}", path.display())]
    UnsupportedFormat { format: String, path: PathBuf },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to serialize {}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// The document root is not a mapping of keys to values.
    #[error("root of {} must be a table, found {found}", path.display())]
    NotATable { path: PathBuf, found: &'static str },

    /// A dotted key walks through a value that is not a table.
    #[error("cannot set '{key}': '{segment}' holds {found}, not a table")]
    PathConflict {
        key: String,
        segment: String,
        found: &'static str,
    },

    /// Empty key or key with an empty segment (`a..b`).
    #[error("invalid key {0:?}")]
    InvalidKey(String),

    #[error("home directory is not available")]
    NoHomeDir,
}

/// Short name of a JSON value's kind, used in error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "a table",
    }
}
