//! Bulk issue page query

use byelinear_core::model::{CanonicalRecord, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{LinearClient, Result};

/// Newest-first page of issues, archived ones included
///
/// Relationships are fetched separately per issue. A null `$number` leaves
/// the filter inert.
pub(crate) const ISSUES_QUERY: &str = r#"
    query($before: String, $last: Int, $number: Float) {
        issues(last: $last, before: $before, filter: {number: {eq: $number}}, includeArchived: true) {
            nodes {
                id
                url
                identifier
                title
                description
                creator {
                    name
                    email
                }
                assignee {
                    name
                    email
                }
                priorityLabel
                state {
                    name
                }
                project {
                    name
                    description
                }
                createdAt
                labels(last: 10) {
                    nodes {
                        name
                        color
                        description
                    }
                }
                comments(last: 10) {
                    nodes {
                        url
                        user {
                            name
                            email
                        }
                        createdAt
                        body
                    }
                }
                integrationResources(last: 10) {
                    nodes {
                        pullRequest {
                            number
                            repoName
                            repoLogin
                        }
                    }
                }
                attachments(last: 10) {
                    nodes {
                        url
                    }
                }
            }
        }
    }
"#;

#[derive(Debug, Serialize)]
pub(crate) struct IssuesVariables<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<&'a str>,
    pub last: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssuesData {
    pub issues: Connection<CanonicalRecord>,
}

impl LinearClient {
    /// Fetch up to `last` issues older than `before`
    pub(crate) async fn issues_page(&self, before: Option<&str>, last: usize) -> Result<Vec<CanonicalRecord>> {
        debug!(before = ?before, last, number = ?self.issue_number(), "Querying Linear issues");

        let variables = IssuesVariables {
            before,
            last,
            number: self.issue_number(),
        };
        let data: IssuesData = self.graphql().query(ISSUES_QUERY, &variables).await?;
        Ok(data.issues.nodes)
    }
}
