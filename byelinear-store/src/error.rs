//! Error types for staging store operations

use std::path::PathBuf;

use thiserror::Error;

/// Staging store error types
///
/// Every variant is a local environment problem; callers treat them as fatal.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem error
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record or checkpoint file could not be decoded
    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with this remote id is already staged
    #[error("Record {0} is already staged")]
    Duplicate(String),

    /// No staged record with this key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Human key cannot be used as a file name
    #[error("Invalid record key: {0:?}")]
    InvalidKey(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for staging store operations
pub type Result<T> = std::result::Result<T, Error>;
