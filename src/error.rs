// src/error.rs
//! Stage errors that abort a run. Live-fetch failures are not here: the resolver
//! recovers from them by switching to the bundled snapshot.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The fallback snapshot is the last resort; nothing remains if it is gone.
    #[error("fallback snapshot {path} could not be read")]
    FallbackUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fallback snapshot {path} is not valid JSON")]
    FallbackInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("raw artifact {path} could not be written")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("raw artifact {path} could not be read")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("raw artifact is not valid JSON")]
    Parse(#[from] serde_json::Error),

    #[error("raw artifact is not a JSON array (found {found})")]
    NotArray { found: &'static str },

    #[error("record {index} is not a JSON object (found {found})")]
    NotObject { index: usize, found: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("building record batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("writing parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("writing csv: {0}")]
    Csv(#[from] csv::Error),
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Short JSON type name for error messages.
pub(crate) fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
