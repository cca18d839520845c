//! Error types for byelinear

use thiserror::Error;

/// Result type alias for byelinear operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for byelinear operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Staging store failure; always fatal
    #[error("Staging store error: {0}")]
    Store(#[from] byelinear_store::Error),

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from a remote API
    #[error("{status}: got body {body:?}")]
    Status { status: u16, body: String },

    /// GraphQL `errors` payload, possibly delivered with HTTP 200
    #[error("GraphQL errors: {0}")]
    GraphQL(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The run was interrupted or hit its deadline at a pause point
    #[error("Interrupted")]
    Interrupted,
}

impl Error {
    /// Whether this is the cooperative-cancellation outcome
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}
