//! Byelinear Core - migration engine for moving Linear issues to GitHub
//!
//! Holds everything that does not talk to a specific remote API: the
//! canonical record model, the pure transformer, configuration, the generic
//! GraphQL transport, and the resumable fetch and export driver.

pub mod config;
pub mod error;
pub mod graphql;
pub mod identity;
pub mod migrate;
pub mod model;
pub mod retry;
pub mod secrets;
pub mod transform;

pub use config::{CliOverrides, Config, GitHubConfig, RepoRef, TimingConfig};
pub use error::{Error, Result};
pub use graphql::{decode_response, GraphQLClient, GraphQLError};
pub use identity::IdentityMap;
pub use migrate::{
    BoxError, ExportReport, Exporter, FetchReport, Migration, Page, SourcePaginator,
};
pub use model::{CanonicalRecord, Relationships};
pub use retry::{pause, retry_until_cancelled, with_deadline, Backoff, DeadlineGuard, Retried};
pub use secrets::Secrets;
pub use transform::{
    classify_closure, classify_status, transform, Closure, Draft, DraftLabel, DraftProject,
    StatusBucket,
};
