//! Error types for Linear operations

use thiserror::Error;

/// Result type for Linear operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading from Linear
#[derive(Error, Debug)]
pub enum Error {
    /// Transport, HTTP status or GraphQL error
    #[error("Linear API error: {0}")]
    Api(#[from] byelinear_core::Error),

    /// Authentication error
    #[error("Linear authentication error: {0}")]
    Auth(String),

    /// Issue not found
    #[error("Issue {0} not found")]
    IssueNotFound(String),
}
