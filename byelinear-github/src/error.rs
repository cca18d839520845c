//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub REST API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// GitHub GraphQL API error, including errors returned with HTTP 200
    #[error("GitHub GraphQL error: {0}")]
    GraphQL(#[from] byelinear_core::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Organization not found or not visible to the token
    #[error("Organization {0} not found")]
    OrgNotFound(String),

    /// Project is missing or has no usable `Status` field
    #[error("Project error: {0}")]
    Project(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}
