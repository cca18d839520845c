//! Per-record export

use async_trait::async_trait;
use byelinear_core::{BoxError, Closure, Draft, DraftLabel, DraftProject, Exporter, StatusBucket};
use byelinear_store::{DestinationCache, ProjectCache, StatusFieldInfo};
use tracing::{info, warn};

use crate::labels::labels_to_create;
use crate::{GitHubClient, Result};

/// Issue as created at the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub number: u64,
    /// GraphQL node id, needed to add the issue to a project
    pub node_id: String,
    pub url: String,
}

/// Remote operations one export is made of
#[async_trait]
pub trait ExportTarget: Send + Sync {
    async fn ensure_label(&self, label: &DraftLabel) -> Result<()>;

    async fn create_issue(&self, draft: &Draft) -> Result<CreatedIssue>;

    async fn close_issue(&self, number: u64, closure: Closure) -> Result<()>;

    async fn create_comment(&self, number: u64, body: &str) -> Result<()>;

    /// Resolve a project by name, consulting and filling `cache`
    async fn ensure_project(
        &self,
        name: &str,
        description: &str,
        cache: &mut DestinationCache,
    ) -> Result<ProjectCache>;

    /// Returns the project item id
    async fn add_to_project(&self, project_id: &str, content_id: &str) -> Result<String>;

    async fn set_item_status(
        &self,
        project_id: &str,
        item_id: &str,
        field: &StatusFieldInfo,
        bucket: StatusBucket,
    ) -> Result<()>;
}

/// Export one draft, step by step, returning the issue URL
///
/// Steps run in order and the first failure aborts the rest. Nothing is
/// rolled back, so a retry after a failure past issue creation creates a
/// second issue. A failed project step evicts that project from `cache` so
/// the retry resolves it afresh.
pub async fn export_draft<T>(target: &T, key: &str, draft: &Draft, cache: &mut DestinationCache) -> Result<String>
where
    T: ExportTarget + ?Sized,
{
    for label in labels_to_create(&draft.labels, cache) {
        info!(key, label = %label.name, "Ensuring label");
        target.ensure_label(label).await?;
        cache.remember_label(label.name.clone());
    }

    info!(key, "Creating issue");
    let issue = target.create_issue(draft).await?;

    if let Some(closure) = draft.closure() {
        info!(key, number = issue.number, reason = closure.as_str(), "Closing issue");
        target.close_issue(issue.number, closure).await?;
    }

    for (i, comment) in draft.comments.iter().enumerate() {
        info!(key, number = issue.number, comment = i, "Creating comment");
        target.create_comment(issue.number, comment).await?;
    }

    if let Some(project) = &draft.project {
        info!(key, project = %project.name, "Ensuring project");
        let attached = attach_to_project(target, key, project, draft.status_bucket(), &issue.node_id, cache).await;
        if let Err(e) = attached {
            warn!(key, project = %project.name, error = %e, "Project step failed, dropping cached project");
            cache.forget_project(&project.name);
            return Err(e);
        }
    }

    Ok(issue.url)
}

async fn attach_to_project<T>(
    target: &T,
    key: &str,
    project: &DraftProject,
    bucket: Option<StatusBucket>,
    content_id: &str,
    cache: &mut DestinationCache,
) -> Result<()>
where
    T: ExportTarget + ?Sized,
{
    let project = target
        .ensure_project(&project.name, &project.description, cache)
        .await?;
    let item_id = target.add_to_project(&project.id, content_id).await?;

    if let (Some(bucket), Some(field)) = (bucket, &project.status_field_info) {
        info!(key, status = bucket.option_name(), "Setting project status");
        target.set_item_status(&project.id, &item_id, field, bucket).await?;
    }
    Ok(())
}

#[async_trait]
impl ExportTarget for GitHubClient {
    async fn ensure_label(&self, label: &DraftLabel) -> Result<()> {
        GitHubClient::ensure_label(self, label).await
    }

    async fn create_issue(&self, draft: &Draft) -> Result<CreatedIssue> {
        let issue = GitHubClient::create_issue(self, draft).await?;
        Ok(CreatedIssue {
            number: issue.number,
            node_id: issue.node_id,
            url: issue.html_url.to_string(),
        })
    }

    async fn close_issue(&self, number: u64, closure: Closure) -> Result<()> {
        GitHubClient::close_issue(self, number, closure).await
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<()> {
        GitHubClient::create_comment(self, number, body).await
    }

    async fn ensure_project(
        &self,
        name: &str,
        description: &str,
        cache: &mut DestinationCache,
    ) -> Result<ProjectCache> {
        GitHubClient::ensure_project(self, name, description, cache).await
    }

    async fn add_to_project(&self, project_id: &str, content_id: &str) -> Result<String> {
        GitHubClient::add_to_project(self, project_id, content_id).await
    }

    async fn set_item_status(
        &self,
        project_id: &str,
        item_id: &str,
        field: &StatusFieldInfo,
        bucket: StatusBucket,
    ) -> Result<()> {
        GitHubClient::set_item_status(self, project_id, item_id, field, bucket).await
    }
}

#[async_trait]
impl Exporter for GitHubClient {
    async fn export(
        &self,
        key: &str,
        draft: &Draft,
        cache: &mut DestinationCache,
    ) -> std::result::Result<String, BoxError> {
        Ok(export_draft(self, key, draft, cache).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Label(String),
        Create(String),
        Close(u64, Closure),
        Comment(u64, String),
        CachedProject(String),
        ResolveProject(String),
        Add(String, String),
        Status(String, StatusBucket),
    }

    /// Records every remote step; project attach can be made to fail once
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        issues: AtomicU64,
        fail_add: AtomicBool,
    }

    impl Recorder {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExportTarget for Recorder {
        async fn ensure_label(&self, label: &DraftLabel) -> Result<()> {
            self.record(Call::Label(label.name.clone()));
            Ok(())
        }

        async fn create_issue(&self, draft: &Draft) -> Result<CreatedIssue> {
            self.record(Call::Create(draft.title.clone()));
            let number = self.issues.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(CreatedIssue {
                number,
                node_id: format!("I_{}", number),
                url: format!("https://github.com/acme/app/issues/{}", number),
            })
        }

        async fn close_issue(&self, number: u64, closure: Closure) -> Result<()> {
            self.record(Call::Close(number, closure));
            Ok(())
        }

        async fn create_comment(&self, number: u64, body: &str) -> Result<()> {
            self.record(Call::Comment(number, body.to_string()));
            Ok(())
        }

        async fn ensure_project(
            &self,
            name: &str,
            description: &str,
            cache: &mut DestinationCache,
        ) -> Result<ProjectCache> {
            if let Some(cached) = cache.project(name) {
                self.record(Call::CachedProject(name.to_string()));
                return Ok(cached.clone());
            }
            self.record(Call::ResolveProject(name.to_string()));
            let project = project(name, &format!("PVT_{}", name), description);
            cache.upsert_project(project.clone());
            Ok(project)
        }

        async fn add_to_project(&self, project_id: &str, content_id: &str) -> Result<String> {
            if self.fail_add.swap(false, Ordering::SeqCst) {
                return Err(Error::Project(format!("project {} not found", project_id)));
            }
            self.record(Call::Add(project_id.to_string(), content_id.to_string()));
            Ok(format!("PVTI_{}", content_id))
        }

        async fn set_item_status(
            &self,
            _project_id: &str,
            item_id: &str,
            _field: &StatusFieldInfo,
            bucket: StatusBucket,
        ) -> Result<()> {
            self.record(Call::Status(item_id.to_string(), bucket));
            Ok(())
        }
    }

    fn project(name: &str, id: &str, description: &str) -> ProjectCache {
        ProjectCache {
            name: name.to_string(),
            id: id.to_string(),
            number: 1,
            description: description.to_string(),
            status_field_info: Some(StatusFieldInfo {
                id: "PVTSSF_1".to_string(),
                todo_id: Some("opt-todo".to_string()),
                in_progress_id: Some("opt-progress".to_string()),
                done_id: Some("opt-done".to_string()),
            }),
        }
    }

    fn draft(title: &str, state: &str, labels: &[&str], comments: &[&str], project: Option<&str>) -> Draft {
        Draft {
            title: title.to_string(),
            body: String::new(),
            assignee: None,
            state: state.to_string(),
            labels: labels
                .iter()
                .map(|name| DraftLabel {
                    name: name.to_string(),
                    color: "eb5757".to_string(),
                    description: String::new(),
                })
                .collect(),
            comments: comments.iter().map(|c| c.to_string()).collect(),
            project: project.map(|name| DraftProject {
                name: name.to_string(),
                description: "Q4 launch".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let target = Recorder::default();
        let mut cache = DestinationCache::default();
        let draft = draft("Crash on start", "Done", &["bug"], &["first", "second"], Some("Launch"));

        let url = export_draft(&target, "ENG-12", &draft, &mut cache).await.unwrap();

        assert_eq!(url, "https://github.com/acme/app/issues/1");
        assert_eq!(
            target.calls(),
            vec![
                Call::Label("bug".to_string()),
                Call::Create("Crash on start".to_string()),
                Call::Close(1, Closure::Completed),
                Call::Comment(1, "first".to_string()),
                Call::Comment(1, "second".to_string()),
                Call::ResolveProject("Launch".to_string()),
                Call::Add("PVT_Launch".to_string(), "I_1".to_string()),
                Call::Status("PVTI_I_1".to_string(), StatusBucket::Done),
            ]
        );
        assert!(cache.has_label("bug"));
        assert!(cache.project("Launch").is_some());
    }

    #[tokio::test]
    async fn test_canceled_closes_as_not_planned_before_comments() {
        let target = Recorder::default();
        let mut cache = DestinationCache::default();
        let draft = draft("Dropped", "Canceled", &[], &["why"], None);

        export_draft(&target, "ENG-3", &draft, &mut cache).await.unwrap();

        assert_eq!(
            target.calls(),
            vec![
                Call::Create("Dropped".to_string()),
                Call::Close(1, Closure::NotPlanned),
                Call::Comment(1, "why".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_backlog_stays_open_without_status() {
        let target = Recorder::default();
        let mut cache = DestinationCache::default();
        let draft = draft("Someday", "Backlog", &[], &[], Some("Launch"));

        export_draft(&target, "ENG-4", &draft, &mut cache).await.unwrap();

        let calls = target.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::Close(..) | Call::Status(..))));
        assert!(calls.contains(&Call::Add("PVT_Launch".to_string(), "I_1".to_string())));
    }

    #[tokio::test]
    async fn test_shared_label_created_once() {
        let target = Recorder::default();
        let mut cache = DestinationCache::default();

        let first = draft("One", "Todo", &["bug", "ui", "bug"], &[], Some("Launch"));
        let second = draft("Two", "Todo", &["bug"], &[], Some("Launch"));
        export_draft(&target, "ENG-1", &first, &mut cache).await.unwrap();
        export_draft(&target, "ENG-2", &second, &mut cache).await.unwrap();

        let calls = target.calls();
        let bug = calls.iter().filter(|c| **c == Call::Label("bug".to_string())).count();
        assert_eq!(bug, 1);
        assert!(calls.contains(&Call::Label("ui".to_string())));
        assert!(calls.contains(&Call::CachedProject("Launch".to_string())));
    }

    #[tokio::test]
    async fn test_failed_project_step_drops_cached_project() {
        let target = Recorder::default();
        target.fail_add.store(true, Ordering::SeqCst);
        let mut cache = DestinationCache::default();
        cache.upsert_project(project("Launch", "PVT_deleted", "Q4 launch"));
        let draft = draft("Crash", "In Progress", &["bug"], &[], Some("Launch"));

        let err = export_draft(&target, "ENG-5", &draft, &mut cache).await.unwrap_err();
        assert!(matches!(err, Error::Project(_)));
        assert!(cache.project("Launch").is_none());
        assert!(cache.has_label("bug"));

        export_draft(&target, "ENG-5", &draft, &mut cache).await.unwrap();

        let calls = target.calls();
        assert!(calls.contains(&Call::CachedProject("Launch".to_string())));
        assert!(calls.contains(&Call::ResolveProject("Launch".to_string())));
        assert!(calls.contains(&Call::Add("PVT_Launch".to_string(), "I_2".to_string())));
        assert!(calls.contains(&Call::Status("PVTI_I_2".to_string(), StatusBucket::InProgress)));
        assert_eq!(cache.project("Launch").unwrap().id, "PVT_Launch");
    }
}
