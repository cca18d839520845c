//! ProjectV2 operations over GraphQL

use byelinear_core::StatusBucket;
use byelinear_store::{DestinationCache, ProjectCache, StatusFieldInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, GitHubClient, Result};

const ORG_PROJECTS_QUERY: &str = r#"
    query($login: String!, $after: String) {
        organization(login: $login) {
            id
            projectsV2(first: 50, after: $after) {
                nodes {
                    id
                    title
                    shortDescription
                    number
                }
                pageInfo {
                    hasNextPage
                    endCursor
                }
            }
        }
    }
"#;

const CREATE_PROJECT_MUTATION: &str = r#"
    mutation($title: String!, $owner: ID!) {
        createProjectV2(input: {title: $title, ownerId: $owner}) {
            projectV2 {
                id
                number
            }
        }
    }
"#;

const UPDATE_DESCRIPTION_MUTATION: &str = r#"
    mutation($projectId: ID!, $shortDescription: String) {
        updateProjectV2(input: {projectId: $projectId, shortDescription: $shortDescription}) {
            clientMutationId
        }
    }
"#;

const STATUS_FIELD_QUERY: &str = r#"
    query($login: String!, $projectNumber: Int!) {
        organization(login: $login) {
            projectV2(number: $projectNumber) {
                field(name: "Status") {
                    ... on ProjectV2SingleSelectField {
                        id
                        options {
                            id
                            name
                        }
                    }
                }
            }
        }
    }
"#;

const ADD_ITEM_MUTATION: &str = r#"
    mutation($projectId: ID!, $contentId: ID!) {
        addProjectV2ItemById(input: {projectId: $projectId, contentId: $contentId}) {
            item {
                id
            }
        }
    }
"#;

const SET_STATUS_MUTATION: &str = r#"
    mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String) {
        updateProjectV2ItemFieldValue(input: {projectId: $projectId, itemId: $itemId, fieldId: $fieldId, value: {singleSelectOptionId: $optionId}}) {
            clientMutationId
        }
    }
"#;

#[derive(Debug, Serialize)]
struct OrgProjectsVariables<'a> {
    login: &'a str,
    after: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct OrgProjectsData {
    organization: Option<OrgProjects>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgProjects {
    id: String,
    projects_v2: ProjectsPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectsPage {
    #[serde(default)]
    nodes: Vec<ProjectNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectNode {
    id: String,
    title: String,
    #[serde(default)]
    short_description: Option<String>,
    number: u64,
}

impl From<ProjectNode> for ProjectCache {
    fn from(node: ProjectNode) -> Self {
        ProjectCache {
            name: node.title,
            id: node.id,
            number: node.number,
            description: node.short_description.unwrap_or_default(),
            status_field_info: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateProjectVariables<'a> {
    title: &'a str,
    owner: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectData {
    create_project_v2: CreatedProject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedProject {
    project_v2: CreatedProjectNode,
}

#[derive(Debug, Deserialize)]
struct CreatedProjectNode {
    id: String,
    number: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDescriptionVariables<'a> {
    project_id: &'a str,
    short_description: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusFieldVariables<'a> {
    login: &'a str,
    project_number: u64,
}

#[derive(Debug, Deserialize)]
struct StatusFieldData {
    organization: Option<StatusFieldOrg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusFieldOrg {
    project_v2: Option<StatusFieldProject>,
}

#[derive(Debug, Deserialize)]
struct StatusFieldProject {
    field: Option<StatusFieldNode>,
}

/// `Status` field; `id` is absent when the field is not single-select
#[derive(Debug, Default, Deserialize)]
struct StatusFieldNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    options: Vec<StatusOption>,
}

#[derive(Debug, Deserialize)]
struct StatusOption {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddItemVariables<'a> {
    project_id: &'a str,
    content_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemData {
    add_project_v2_item_by_id: AddedItem,
}

#[derive(Debug, Deserialize)]
struct AddedItem {
    item: ItemNode,
}

#[derive(Debug, Deserialize)]
struct ItemNode {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetStatusVariables<'a> {
    project_id: &'a str,
    item_id: &'a str,
    field_id: &'a str,
    option_id: &'a str,
}

impl GitHubClient {
    /// Organization node id and every project it owns
    pub async fn list_projects(&self) -> Result<(String, Vec<ProjectCache>)> {
        let login = self.owner();
        let mut projects = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let variables = OrgProjectsVariables {
                login,
                after: after.as_deref(),
            };
            let data: OrgProjectsData = self.graphql().query(ORG_PROJECTS_QUERY, &variables).await?;
            let org = data
                .organization
                .ok_or_else(|| Error::OrgNotFound(login.to_string()))?;

            projects.extend(org.projects_v2.nodes.into_iter().map(ProjectCache::from));

            let page_info = org.projects_v2.page_info;
            match page_info.end_cursor {
                Some(cursor) if page_info.has_next_page => after = Some(cursor),
                _ => {
                    debug!(login, count = projects.len(), "Listed organization projects");
                    return Ok((org.id, projects));
                }
            }
        }
    }

    /// Create a project owned by the organization; returns its id and number
    pub async fn create_project(&self, org_id: &str, title: &str) -> Result<(String, u64)> {
        let data: CreateProjectData = self
            .graphql()
            .query(
                CREATE_PROJECT_MUTATION,
                &CreateProjectVariables {
                    title,
                    owner: org_id,
                },
            )
            .await?;
        let project = data.create_project_v2.project_v2;
        info!(title, number = project.number, "Created project");
        Ok((project.id, project.number))
    }

    pub async fn update_project_description(&self, project_id: &str, description: &str) -> Result<()> {
        debug!(project_id, "Updating project description");
        self.graphql()
            .mutate(
                UPDATE_DESCRIPTION_MUTATION,
                &UpdateDescriptionVariables {
                    project_id,
                    short_description: description,
                },
            )
            .await?;
        Ok(())
    }

    /// Resolve the `Status` field of a project and its option ids
    pub async fn status_field(&self, project_number: u64) -> Result<StatusFieldInfo> {
        let data: StatusFieldData = self
            .graphql()
            .query(
                STATUS_FIELD_QUERY,
                &StatusFieldVariables {
                    login: self.owner(),
                    project_number,
                },
            )
            .await?;

        let field = data
            .organization
            .and_then(|o| o.project_v2)
            .ok_or_else(|| Error::Project(format!("project #{} not found", project_number)))?
            .field
            .unwrap_or_default();

        status_field_info(field).ok_or_else(|| {
            Error::Project(format!(
                "project #{} has no single-select Status field",
                project_number
            ))
        })
    }

    /// Add an issue to a project; returns the project item id
    pub async fn add_to_project(&self, project_id: &str, content_id: &str) -> Result<String> {
        let data: AddItemData = self
            .graphql()
            .query(
                ADD_ITEM_MUTATION,
                &AddItemVariables {
                    project_id,
                    content_id,
                },
            )
            .await?;
        Ok(data.add_project_v2_item_by_id.item.id)
    }

    /// Set an item's `Status`; a bucket without a matching option is skipped
    pub async fn set_item_status(
        &self,
        project_id: &str,
        item_id: &str,
        field: &StatusFieldInfo,
        bucket: StatusBucket,
    ) -> Result<()> {
        let Some(option_id) = option_id(field, bucket) else {
            warn!(
                project_id,
                status = bucket.option_name(),
                "Project has no such Status option, leaving status unset"
            );
            return Ok(());
        };

        self.graphql()
            .mutate(
                SET_STATUS_MUTATION,
                &SetStatusVariables {
                    project_id,
                    item_id,
                    field_id: &field.id,
                    option_id,
                },
            )
            .await?;
        Ok(())
    }

    /// Project with this title, created or reconciled as needed
    ///
    /// The result always carries its status field and is stored in `cache`.
    pub async fn ensure_project(
        &self,
        name: &str,
        description: &str,
        cache: &mut DestinationCache,
    ) -> Result<ProjectCache> {
        if let Some(cached) = cache.project(name) {
            if cached.description == description && cached.status_field_info.is_some() {
                debug!(name, "Using cached project");
                return Ok(cached.clone());
            }
        }

        let (org_id, projects) = self.list_projects().await?;
        let mut project = match projects.into_iter().find(|p| p.name == name) {
            Some(existing) => existing,
            None => {
                let (id, number) = self.create_project(&org_id, name).await?;
                ProjectCache {
                    name: name.to_string(),
                    id,
                    number,
                    description: String::new(),
                    status_field_info: None,
                }
            }
        };

        if project.description != description {
            self.update_project_description(&project.id, description).await?;
            project.description = description.to_string();
        }

        project.status_field_info = Some(self.status_field(project.number).await?);
        cache.upsert_project(project.clone());
        Ok(project)
    }
}

fn status_field_info(field: StatusFieldNode) -> Option<StatusFieldInfo> {
    let mut info = StatusFieldInfo {
        id: field.id?,
        ..Default::default()
    };
    for option in field.options {
        match option.name.as_str() {
            "Todo" => info.todo_id = Some(option.id),
            "In Progress" => info.in_progress_id = Some(option.id),
            "Done" => info.done_id = Some(option.id),
            _ => {}
        }
    }
    Some(info)
}

fn option_id(field: &StatusFieldInfo, bucket: StatusBucket) -> Option<&str> {
    match bucket {
        StatusBucket::Todo => field.todo_id.as_deref(),
        StatusBucket::InProgress => field.in_progress_id.as_deref(),
        StatusBucket::Done => field.done_id.as_deref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byelinear_core::decode_response;

    #[test]
    fn test_decode_projects_page() {
        let body = br#"{
            "data": {
                "organization": {
                    "id": "O_1",
                    "projectsV2": {
                        "nodes": [
                            {"id": "PVT_1", "title": "Launch", "shortDescription": "Q4 launch", "number": 3},
                            {"id": "PVT_2", "title": "Infra", "shortDescription": null, "number": 4}
                        ],
                        "pageInfo": {"hasNextPage": true, "endCursor": "Y3Vyc29y"}
                    }
                }
            }
        }"#;

        let data: OrgProjectsData = decode_response(body).unwrap();
        let org = data.organization.unwrap();
        assert_eq!(org.id, "O_1");
        assert!(org.projects_v2.page_info.has_next_page);
        assert_eq!(org.projects_v2.page_info.end_cursor.as_deref(), Some("Y3Vyc29y"));

        let projects: Vec<ProjectCache> = org.projects_v2.nodes.into_iter().map(ProjectCache::from).collect();
        assert_eq!(projects[0].name, "Launch");
        assert_eq!(projects[0].number, 3);
        assert_eq!(projects[1].description, "");
    }

    #[test]
    fn test_decode_status_field() {
        let body = br#"{
            "data": {
                "organization": {
                    "projectV2": {
                        "field": {
                            "id": "PVTSSF_1",
                            "options": [
                                {"id": "a", "name": "Todo"},
                                {"id": "b", "name": "In Progress"},
                                {"id": "c", "name": "Done"},
                                {"id": "d", "name": "Blocked"}
                            ]
                        }
                    }
                }
            }
        }"#;

        let data: StatusFieldData = decode_response(body).unwrap();
        let field = data.organization.unwrap().project_v2.unwrap().field.unwrap();
        let info = status_field_info(field).unwrap();

        assert_eq!(info.id, "PVTSSF_1");
        assert_eq!(option_id(&info, StatusBucket::Todo), Some("a"));
        assert_eq!(option_id(&info, StatusBucket::InProgress), Some("b"));
        assert_eq!(option_id(&info, StatusBucket::Done), Some("c"));
    }

    #[test]
    fn test_status_field_not_single_select() {
        let data: StatusFieldData =
            decode_response(br#"{"data": {"organization": {"projectV2": {"field": {}}}}}"#).unwrap();
        let field = data.organization.unwrap().project_v2.unwrap().field.unwrap();
        assert!(status_field_info(field).is_none());
    }

    #[test]
    fn test_missing_option() {
        let info = StatusFieldInfo {
            id: "f".to_string(),
            todo_id: Some("a".to_string()),
            ..Default::default()
        };
        assert_eq!(option_id(&info, StatusBucket::Done), None);
    }

    #[test]
    fn test_decode_mutations() {
        let created: CreateProjectData = decode_response(
            br#"{"data": {"createProjectV2": {"projectV2": {"id": "PVT_9", "number": 9}}}}"#,
        )
        .unwrap();
        assert_eq!(created.create_project_v2.project_v2.number, 9);

        let added: AddItemData =
            decode_response(br#"{"data": {"addProjectV2ItemById": {"item": {"id": "PVTI_1"}}}}"#).unwrap();
        assert_eq!(added.add_project_v2_item_by_id.item.id, "PVTI_1");
    }

    #[test]
    fn test_variables_are_camel_case() {
        let vars = SetStatusVariables {
            project_id: "p",
            item_id: "i",
            field_id: "f",
            option_id: "o",
        };
        assert_eq!(
            serde_json::to_value(&vars).unwrap(),
            serde_json::json!({"projectId": "p", "itemId": "i", "fieldId": "f", "optionId": "o"})
        );
    }
}
