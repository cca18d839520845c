//! Per-issue relationship query

use byelinear_core::Relationships;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, LinearClient, Result};

pub(crate) const RELATIONS_QUERY: &str = r#"
    query($id: String!) {
        issue(id: $id) {
            relations(last: 10) {
                nodes {
                    relatedIssue {
                        identifier
                    }
                }
            }
            parent {
                identifier
            }
            children(last: 10) {
                nodes {
                    identifier
                }
            }
        }
    }
"#;

#[derive(Debug, Serialize)]
struct RelationsVariables<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RelationsData {
    issue: Option<Relationships>,
}

impl LinearClient {
    /// Fetch parent, children and related issues of one issue
    pub(crate) async fn relationships(&self, id: &str) -> Result<Relationships> {
        debug!(id, "Querying Linear issue relationships");

        let data: RelationsData = self
            .graphql()
            .query(RELATIONS_QUERY, &RelationsVariables { id })
            .await?;
        data.issue.ok_or_else(|| Error::IssueNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byelinear_core::decode_response;

    #[test]
    fn test_decode_relationships() {
        let body = br#"{
            "data": {
                "issue": {
                    "relations": {"nodes": [{"relatedIssue": {"identifier": "ENG-9"}}]},
                    "parent": null,
                    "children": {"nodes": [{"identifier": "ENG-11"}]}
                }
            }
        }"#;

        let data: RelationsData = decode_response(body).unwrap();
        let relationships = data.issue.unwrap();
        assert_eq!(relationships.relations.nodes[0].related_issue.identifier, "ENG-9");
        assert!(relationships.parent.is_none());
        assert_eq!(relationships.children.nodes[0].identifier, "ENG-11");
    }

    #[test]
    fn test_missing_issue_decodes_to_none() {
        let data: RelationsData = decode_response(br#"{"data": {"issue": null}}"#).unwrap();
        assert!(data.issue.is_none());
    }

    #[test]
    fn test_graphql_error_payload() {
        let body = br#"{"data": null, "errors": [{"message": "Entity not found"}]}"#;
        assert!(decode_response::<RelationsData>(body).is_err());
    }
}
