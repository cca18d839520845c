//! Canonical source record
//!
//! Shape of one fully-detailed Linear issue as fetched and as stored on disk.
//! Serialized field names follow the Linear GraphQL schema, so the bulk page
//! query decodes straight into [`CanonicalRecord`] and record files written by
//! earlier runs stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// GraphQL `null` decodes to the default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A `{ nodes: [...] }` connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> From<Vec<T>> for Connection<T> {
    fn from(nodes: Vec<T>) -> Self {
        Self { nodes }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub url: String,
    /// Absent for integration and bot comments
    #[serde(default)]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
}

/// Reference to another source record by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueKey {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub related_issue: IssueKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    pub number: u64,
    pub repo_login: String,
    pub repo_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResource {
    #[serde(default)]
    pub pull_request: Option<PullRequestRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
}

/// Relationship data fetched by the per-record secondary query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default)]
    pub relations: Connection<Relation>,
    #[serde(default)]
    pub parent: Option<IssueKey>,
    #[serde(default)]
    pub children: Connection<IssueKey>,
}

/// Fully-detailed source record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Opaque source id, also the pagination anchor
    pub id: String,
    #[serde(default)]
    pub url: String,
    /// Human key such as `ENG-42`
    pub identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Missing on synthetic records such as onboarding placeholders
    #[serde(default)]
    pub creator: Option<User>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority_label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: WorkflowState,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Connection<Label>,
    #[serde(default)]
    pub comments: Connection<Comment>,
    #[serde(default)]
    pub integration_resources: Connection<IntegrationResource>,
    #[serde(default)]
    pub attachments: Connection<Attachment>,
    #[serde(default)]
    pub relations: Connection<Relation>,
    #[serde(default)]
    pub parent: Option<IssueKey>,
    #[serde(default)]
    pub children: Connection<IssueKey>,
}

impl CanonicalRecord {
    /// A record without a creator is a placeholder, not real user data
    pub fn is_synthetic(&self) -> bool {
        self.creator.is_none()
    }

    /// Merge in relationship data from the secondary query
    pub fn with_relationships(mut self, relationships: Relationships) -> Self {
        self.relations = relationships.relations;
        self.parent = relationships.parent;
        self.children = relationships.children;
        self
    }

    /// Project the record belongs to, if any
    pub fn project(&self) -> Option<&ProjectRef> {
        self.project.as_ref().filter(|p| !p.name.is_empty())
    }

    pub fn label_names(&self) -> Vec<&str> {
        self.labels.nodes.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn related_keys(&self) -> Vec<&str> {
        self.relations
            .nodes
            .iter()
            .map(|r| r.related_issue.identifier.as_str())
            .collect()
    }

    pub fn children_keys(&self) -> Vec<&str> {
        self.children
            .nodes
            .iter()
            .map(|c| c.identifier.as_str())
            .collect()
    }

    pub fn parent_key(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.identifier.as_str())
    }

    pub fn pull_requests(&self) -> impl Iterator<Item = &PullRequestRef> {
        self.integration_resources
            .nodes
            .iter()
            .filter_map(|r| r.pull_request.as_ref())
    }

    pub fn attachment_urls(&self) -> Vec<&str> {
        self.attachments.nodes.iter().map(|a| a.url.as_str()).collect()
    }
}
