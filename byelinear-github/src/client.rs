//! GitHub API client using octocrab

use byelinear_core::{GraphQLClient, RepoRef, Secrets};
use octocrab::Octocrab;
use tracing::{debug, info};

use crate::{Error, Result};

/// GitHub GraphQL endpoint, used for ProjectV2 operations
pub const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

/// GitHub API client bound to the destination repository
pub struct GitHubClient {
    client: Octocrab,
    graphql: GraphQLClient,
    repo: RepoRef,
}

impl GitHubClient {
    /// Create a new GitHub client for the destination repository
    pub fn new(repo: RepoRef, token: &str) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        let graphql = GraphQLClient::new(GITHUB_GRAPHQL_ENDPOINT).with_bearer(token);

        info!(owner = %repo.owner, repo = %repo.repo, "Created GitHub client");

        Ok(Self {
            client,
            graphql,
            repo,
        })
    }

    /// Create a client from loaded secrets
    ///
    /// Token is taken from (in priority order):
    /// 1. GITHUB_TOKEN environment variable
    /// 2. ~/.config/byelinear/secrets.toml
    pub fn from_secrets(repo: RepoRef, secrets: &Secrets) -> Result<Self> {
        let token = secrets.github_token().ok_or_else(|| {
            Error::Auth(
                "GitHub token not found. Set GITHUB_TOKEN environment variable \
                 or add token to ~/.config/byelinear/secrets.toml"
                    .to_string(),
            )
        })?;
        Self::new(repo, &token)
    }

    /// Repository owner, also the organization that owns projects
    pub fn owner(&self) -> &str {
        &self.repo.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo.repo
    }

    pub fn repo_ref(&self) -> &RepoRef {
        &self.repo
    }

    pub(crate) fn client(&self) -> &Octocrab {
        &self.client
    }

    pub(crate) fn graphql(&self) -> &GraphQLClient {
        &self.graphql
    }

    /// Check the token can see the destination repository
    pub async fn verify_repository(&self) -> Result<()> {
        debug!(owner = %self.owner(), repo = %self.repo(), "Verifying destination repository");

        self.client
            .repos(self.owner(), self.repo())
            .get()
            .await
            .map_err(|e| match e {
                octocrab::Error::GitHub { ref source, .. } if source.message.contains("Not Found") => {
                    Error::Other(format!(
                        "Repository {} not found or not accessible",
                        self.repo
                    ))
                }
                octocrab::Error::GitHub { ref source, .. }
                    if source.message.contains("Bad credentials") =>
                {
                    Error::Auth("Invalid GitHub token".to_string())
                }
                other => Error::Api(other),
            })?;

        info!(repo = %self.repo, "Destination repository reachable");
        Ok(())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("owner", &self.repo.owner)
            .field("repo", &self.repo.repo)
            .finish_non_exhaustive()
    }
}
