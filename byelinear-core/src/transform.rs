//! Source record to destination draft
//!
//! [`transform`] is pure: the same record, identity table and destination
//! repository always produce the same [`Draft`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RepoRef;
use crate::identity::IdentityMap;
use crate::model::{CanonicalRecord, Comment, PullRequestRef};

/// Locale-independent timestamp format used in metadata tables
const DATE_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

/// Reason attached when closing a destination issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closure {
    Completed,
    NotPlanned,
}

impl Closure {
    /// GitHub `state_reason` value
    pub fn as_str(&self) -> &'static str {
        match self {
            Closure::Completed => "completed",
            Closure::NotPlanned => "not_planned",
        }
    }
}

/// Fixed project status vocabulary every source state maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusBucket {
    Todo,
    InProgress,
    Done,
}

impl StatusBucket {
    /// Option name in the project's `Status` field
    pub fn option_name(&self) -> &'static str {
        match self {
            StatusBucket::Todo => "Todo",
            StatusBucket::InProgress => "In Progress",
            StatusBucket::Done => "Done",
        }
    }
}

/// Whether a source state closes the destination issue, and why
pub fn classify_closure(state: &str) -> Option<Closure> {
    match state {
        "Done" => Some(Closure::Completed),
        "Canceled" => Some(Closure::NotPlanned),
        _ => None,
    }
}

/// Project status for a source state; `Backlog` and unknown states get none
pub fn classify_status(state: &str) -> Option<StatusBucket> {
    match state {
        "Todo" => Some(StatusBucket::Todo),
        "In Progress" | "In Review" => Some(StatusBucket::InProgress),
        "Done" | "Canceled" => Some(StatusBucket::Done),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLabel {
    pub name: String,
    /// Hex color without the leading `#`
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftProject {
    pub name: String,
    pub description: String,
}

/// Destination-shaped issue, not yet sent anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub body: String,
    /// Destination login, if the source assignee is mapped
    pub assignee: Option<String>,
    /// Source state name
    pub state: String,
    pub labels: Vec<DraftLabel>,
    /// Comment bodies, oldest first
    pub comments: Vec<String>,
    pub project: Option<DraftProject>,
}

impl Draft {
    pub fn closure(&self) -> Option<Closure> {
        classify_closure(&self.state)
    }

    pub fn status_bucket(&self) -> Option<StatusBucket> {
        classify_status(&self.state)
    }

    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }
}

/// Build the destination draft for a source record
pub fn transform(record: &CanonicalRecord, identities: &IdentityMap, destination: &RepoRef) -> Draft {
    let mention = |email: Option<&str>| email.map(|e| identities.mention(e)).unwrap_or_default();

    let prs: Vec<String> = record
        .pull_requests()
        .map(|pr| format_pull_request(pr, destination))
        .collect();

    let mut body = MetadataTable::new()
        .row("url", &record.url)
        .row("author", &mention(record.creator.as_ref().map(|u| u.email.as_str())))
        .row("date", &format_date(&record.created_at))
        .row("state", &record.state.name)
        .row("project", record.project().map(|p| p.name.as_str()).unwrap_or_default())
        .row("priority", &record.priority_label)
        .row("assignee", &mention(record.assignee.as_ref().map(|u| u.email.as_str())))
        .row("labels", &record.label_names().join(" "))
        .row("related", &record.related_keys().join(" "))
        .row("parent", record.parent_key().unwrap_or_default())
        .row("children", &record.children_keys().join(" "))
        .row("PRs", &prs.join(" "))
        .row("attachments", &record.attachment_urls().join(" "))
        .finish();
    if !record.description.is_empty() {
        body.push('\n');
        body.push_str(&record.description);
    }

    // The source lists comments newest first
    let comments = record
        .comments
        .nodes
        .iter()
        .rev()
        .map(|c| format_comment(c, identities))
        .collect();

    Draft {
        title: format!("{}: {}", record.identifier, record.title),
        body,
        assignee: record
            .assignee
            .as_ref()
            .and_then(|u| identities.handle(&u.email))
            .map(str::to_string),
        state: record.state.name.clone(),
        labels: record
            .labels
            .nodes
            .iter()
            .map(|l| DraftLabel {
                name: l.name.clone(),
                color: l.color.trim_start_matches('#').to_string(),
                description: l.description.clone(),
            })
            .collect(),
        comments,
        project: record.project().map(|p| DraftProject {
            name: p.name.clone(),
            description: p.description.clone(),
        }),
    }
}

fn format_comment(comment: &Comment, identities: &IdentityMap) -> String {
    let author = comment
        .user
        .as_ref()
        .map(|u| identities.mention(&u.email))
        .unwrap_or_default();

    let mut body = MetadataTable::new()
        .row("url", &comment.url)
        .row("author", &author)
        .row("date", &format_date(&comment.created_at))
        .finish();
    body.push('\n');
    body.push_str(&comment.body);
    body
}

fn format_pull_request(pr: &PullRequestRef, destination: &RepoRef) -> String {
    if destination.is(&pr.repo_login, &pr.repo_name) {
        format!("#{}", pr.number)
    } else {
        format!("{}/{}#{}", pr.repo_login, pr.repo_name, pr.number)
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Two-column markdown table builder
struct MetadataTable {
    out: String,
}

impl MetadataTable {
    fn new() -> Self {
        Self {
            out: String::from("field | value\n| - | - |\n"),
        }
    }

    fn row(mut self, field: &str, value: &str) -> Self {
        self.out.push_str(field);
        self.out.push_str(" | ");
        self.out.push_str(value);
        self.out.push('\n');
        self
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::record;
    use crate::model::{
        Attachment, Connection, IntegrationResource, IssueKey, Label, ProjectRef, User,
    };
    use chrono::TimeZone;

    fn identities() -> IdentityMap {
        [
            ("gavin@example.com", "gavin-ts"),
            ("alex@example.com", "alixander"),
        ]
        .into_iter()
        .collect()
    }

    fn dest() -> RepoRef {
        RepoRef::new("acme", "app")
    }

    fn comment(n: u32, email: &str) -> Comment {
        Comment {
            url: format!("https://linear.app/acme/comment/{}", n),
            user: Some(User {
                name: String::new(),
                email: email.to_string(),
            }),
            created_at: Utc.with_ymd_and_hms(2022, 11, n, 9, 0, 0).unwrap(),
            body: format!("C{}", n),
        }
    }

    #[test]
    fn test_title_and_body_table() {
        let mut source = record("id-1", "ENG-12");
        source.description = "Steps to reproduce".to_string();

        let draft = transform(&source, &identities(), &dest());

        assert_eq!(draft.title, "ENG-12: Title of ENG-12");
        let expected = "field | value\n\
            | - | - |\n\
            url | https://linear.app/acme/issue/ENG-12\n\
            author | @gavin-ts\n\
            date | Thu Nov  3 17:04:05 UTC 2022\n\
            state | Todo\n\
            project | \n\
            priority | No priority\n\
            assignee | \n\
            labels | \n\
            related | \n\
            parent | \n\
            children | \n\
            PRs | \n\
            attachments | \n\
            \n\
            Steps to reproduce";
        assert_eq!(draft.body, expected);
    }

    #[test]
    fn test_empty_description_omitted() {
        let draft = transform(&record("id-1", "ENG-1"), &identities(), &dest());
        assert!(draft.body.ends_with("attachments | \n"));
    }

    #[test]
    fn test_comments_reversed_to_oldest_first() {
        let mut source = record("id-1", "ENG-1");
        source.comments = Connection::from(vec![
            comment(3, "alex@example.com"),
            comment(2, "gavin@example.com"),
            comment(1, "alex@example.com"),
        ]);

        let draft = transform(&source, &identities(), &dest());

        let texts: Vec<&str> = draft
            .comments
            .iter()
            .map(|c| c.rsplit('\n').next().unwrap())
            .collect();
        assert_eq!(texts, vec!["C1", "C2", "C3"]);
        assert!(draft.comments[0].contains("author | @alixander\n"));
        assert!(draft.comments[0].contains("date | Tue Nov  1 09:00:00 UTC 2022\n\nC1"));
    }

    #[test]
    fn test_comment_without_user() {
        let mut source = record("id-1", "ENG-1");
        let mut bot = comment(1, "");
        bot.user = None;
        source.comments = Connection::from(vec![bot]);

        let draft = transform(&source, &identities(), &dest());
        assert!(draft.comments[0].contains("author | \n"));
    }

    #[test]
    fn test_unmapped_identities_are_empty() {
        let mut source = record("id-1", "ENG-1");
        source.creator = Some(User {
            name: "Stranger".to_string(),
            email: "stranger@example.com".to_string(),
        });
        source.assignee = source.creator.clone();

        let draft = transform(&source, &identities(), &dest());
        assert!(draft.body.contains("author | \n"));
        assert!(draft.body.contains("assignee | \n"));
        assert!(draft.assignee.is_none());
    }

    #[test]
    fn test_mapped_assignee() {
        let mut source = record("id-1", "ENG-1");
        source.assignee = Some(User {
            name: "Alex".to_string(),
            email: "alex@example.com".to_string(),
        });

        let draft = transform(&source, &identities(), &dest());
        assert_eq!(draft.assignee.as_deref(), Some("alixander"));
        assert!(draft.body.contains("assignee | @alixander\n"));
    }

    #[test]
    fn test_relationship_and_link_cells() {
        let mut source = record("id-1", "ENG-1");
        source.labels = Connection::from(vec![
            Label {
                name: "bug".to_string(),
                color: "#eb5757".to_string(),
                description: "Broken".to_string(),
            },
            Label {
                name: "infra".to_string(),
                color: "4ea7fc".to_string(),
                description: String::new(),
            },
        ]);
        source.relations = Connection::from(vec![crate::model::Relation {
            related_issue: IssueKey {
                identifier: "ENG-9".to_string(),
            },
        }]);
        source.parent = Some(IssueKey {
            identifier: "ENG-0".to_string(),
        });
        source.children = Connection::from(vec![
            IssueKey {
                identifier: "ENG-2".to_string(),
            },
            IssueKey {
                identifier: "ENG-3".to_string(),
            },
        ]);
        source.integration_resources = Connection::from(vec![
            IntegrationResource {
                pull_request: Some(PullRequestRef {
                    number: 42,
                    repo_login: "acme".to_string(),
                    repo_name: "app".to_string(),
                }),
            },
            IntegrationResource {
                pull_request: Some(PullRequestRef {
                    number: 7,
                    repo_login: "acme".to_string(),
                    repo_name: "docs".to_string(),
                }),
            },
            IntegrationResource { pull_request: None },
        ]);
        source.attachments = Connection::from(vec![Attachment {
            url: "https://example.com/trace.txt".to_string(),
        }]);

        let draft = transform(&source, &identities(), &dest());

        assert!(draft.body.contains("labels | bug infra\n"));
        assert!(draft.body.contains("related | ENG-9\n"));
        assert!(draft.body.contains("parent | ENG-0\n"));
        assert!(draft.body.contains("children | ENG-2 ENG-3\n"));
        assert!(draft.body.contains("PRs | #42 acme/docs#7\n"));
        assert!(draft.body.contains("attachments | https://example.com/trace.txt\n"));
        assert_eq!(draft.labels[0].color, "eb5757");
        assert_eq!(draft.labels[1].color, "4ea7fc");
        assert_eq!(draft.label_names(), vec!["bug", "infra"]);
    }

    #[test]
    fn test_project_reference() {
        let mut source = record("id-1", "ENG-1");
        source.project = Some(ProjectRef {
            name: "Launch".to_string(),
            description: "Q4 launch".to_string(),
        });

        let draft = transform(&source, &identities(), &dest());
        assert_eq!(
            draft.project,
            Some(DraftProject {
                name: "Launch".to_string(),
                description: "Q4 launch".to_string(),
            })
        );
        assert!(draft.body.contains("project | Launch\n"));
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(classify_closure("Done"), Some(Closure::Completed));
        assert_eq!(classify_status("Done"), Some(StatusBucket::Done));

        assert_eq!(classify_closure("Canceled"), Some(Closure::NotPlanned));
        assert_eq!(classify_status("Canceled"), Some(StatusBucket::Done));

        assert_eq!(classify_closure("Backlog"), None);
        assert_eq!(classify_status("Backlog"), None);

        assert_eq!(classify_closure("In Review"), None);
        assert_eq!(classify_status("In Review"), Some(StatusBucket::InProgress));
        assert_eq!(classify_status("Todo"), Some(StatusBucket::Todo));
        assert_eq!(classify_status("Triage"), None);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let source = record("id-1", "ENG-1");
        assert_eq!(
            transform(&source, &identities(), &dest()),
            transform(&source, &identities(), &dest())
        );
    }
}
