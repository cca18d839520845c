//! Linear API client

use async_trait::async_trait;
use byelinear_core::{BoxError, GraphQLClient, Page, Secrets, SourcePaginator};
use tracing::{debug, info};

use crate::{Error, Result};

/// Linear GraphQL endpoint
pub const LINEAR_ENDPOINT: &str = "https://api.linear.app/graphql";

/// Linear API client for reading a workspace's issues
#[derive(Clone)]
pub struct LinearClient {
    graphql: GraphQLClient,
    issue_number: Option<u64>,
}

impl LinearClient {
    /// Create a client authenticated with a personal API key
    ///
    /// Linear takes the key itself as the `Authorization` value, without a
    /// scheme.
    pub fn new(api_key: &str) -> Self {
        Self {
            graphql: GraphQLClient::new(LINEAR_ENDPOINT).with_authorization(api_key),
            issue_number: None,
        }
    }

    /// Create a client from loaded secrets
    ///
    /// Key is taken from (in priority order):
    /// 1. LINEAR_API_KEY environment variable
    /// 2. ~/.config/byelinear/secrets.toml
    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        let api_key = secrets.linear_api_key().ok_or_else(|| {
            Error::Auth(
                "Linear API key not found. Set LINEAR_API_KEY environment variable \
                 or add api_key to ~/.config/byelinear/secrets.toml"
                    .to_string(),
            )
        })?;

        info!("Created Linear client");
        Ok(Self::new(&api_key))
    }

    /// Restrict every page to the issue with this number
    pub fn with_issue_number(mut self, number: Option<u64>) -> Self {
        self.issue_number = number;
        self
    }

    pub fn issue_number(&self) -> Option<u64> {
        self.issue_number
    }

    pub(crate) fn graphql(&self) -> &GraphQLClient {
        &self.graphql
    }

    /// Fetch one page and attach relationships to every issue on it
    pub async fn page(&self, before: Option<&str>, page_size: usize) -> Result<Page> {
        let issues = self.issues_page(before, page_size).await?;

        let mut records = Vec::with_capacity(issues.len());
        for issue in issues {
            let relationships = self.relationships(&issue.id).await?;
            records.push(issue.with_relationships(relationships));
        }

        debug!(count = records.len(), "Fetched Linear page");
        Ok(Page::new(records))
    }
}

#[async_trait]
impl SourcePaginator for LinearClient {
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> std::result::Result<Page, BoxError> {
        Ok(self.page(cursor, page_size).await?)
    }
}

impl std::fmt::Debug for LinearClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearClient")
            .field("endpoint", &self.graphql.endpoint())
            .field("issue_number", &self.issue_number)
            .finish_non_exhaustive()
    }
}
