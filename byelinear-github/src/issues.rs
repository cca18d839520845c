//! Issue creation, closing and comments

use byelinear_core::{Closure, Draft};
use octocrab::models::issues::Issue;
use serde::Serialize;
use tracing::debug;

use crate::{Error, GitHubClient, Result};

/// PATCH body that closes an issue with a reason
#[derive(Debug, Serialize)]
struct CloseIssue {
    state: &'static str,
    state_reason: &'static str,
}

impl CloseIssue {
    fn new(closure: Closure) -> Self {
        Self {
            state: "closed",
            state_reason: closure.as_str(),
        }
    }
}

impl GitHubClient {
    /// Create the issue with its full label set in one call
    pub async fn create_issue(&self, draft: &Draft) -> Result<Issue> {
        debug!(title = %draft.title, "Creating issue");

        let issue = self
            .client()
            .issues(self.owner(), self.repo())
            .create(&draft.title)
            .body(&draft.body)
            .labels(draft.label_names())
            .assignees(draft.assignee.iter().cloned().collect::<Vec<_>>())
            .send()
            .await
            .map_err(Error::Api)?;

        Ok(issue)
    }

    /// Close an issue, recording why
    pub async fn close_issue(&self, number: u64, closure: Closure) -> Result<()> {
        debug!(number, reason = closure.as_str(), "Closing issue");

        let route = format!("/repos/{}/{}/issues/{}", self.owner(), self.repo(), number);
        let _: Issue = self
            .client()
            .patch(route, Some(&CloseIssue::new(closure)))
            .await
            .map_err(Error::Api)?;
        Ok(())
    }

    pub async fn create_comment(&self, number: u64, body: &str) -> Result<()> {
        self.client()
            .issues(self.owner(), self.repo())
            .create_comment(number, body)
            .await
            .map_err(Error::Api)?;
        Ok(())
    }
}
