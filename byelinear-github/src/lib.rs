//! Byelinear GitHub - destination side of the migration
//!
//! Turns drafts into GitHub issues: labels, the issue itself, its closed
//! state, comments and ProjectV2 membership. Issues, labels and comments go
//! through the REST API; projects only exist in the GraphQL API.

mod client;
mod error;
mod export;
mod issues;
mod labels;
mod projects;

pub use client::{GitHubClient, GITHUB_GRAPHQL_ENDPOINT};
pub use error::{Error, Result};
pub use export::{export_draft, CreatedIssue, ExportTarget};
