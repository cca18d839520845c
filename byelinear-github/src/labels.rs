//! Label provisioning

use byelinear_core::DraftLabel;
use byelinear_store::DestinationCache;
use tracing::{debug, info};

use crate::{Error, GitHubClient, Result};

impl GitHubClient {
    /// Create a label unless it already exists
    pub async fn ensure_label(&self, label: &DraftLabel) -> Result<()> {
        debug!(name = %label.name, "Ensuring label");

        let created = self
            .client()
            .issues(self.owner(), self.repo())
            .create_label(&label.name, &label.color, &label.description)
            .await;

        match created {
            Ok(_) => {
                info!(name = %label.name, "Created label");
                Ok(())
            }
            Err(octocrab::Error::GitHub { ref source, .. })
                if source
                    .errors
                    .as_deref()
                    .is_some_and(errors_are_already_exists) =>
            {
                debug!(name = %label.name, "Label already exists");
                Ok(())
            }
            Err(e) => Err(Error::Api(e)),
        }
    }
}

/// Whether a validation failure only says the label is already there
pub(crate) fn errors_are_already_exists(errors: &[serde_json::Value]) -> bool {
    matches!(errors, [only] if only.get("code").and_then(|c| c.as_str()) == Some("already_exists"))
}

/// Labels of a draft not yet known to exist, without repeats
pub(crate) fn labels_to_create<'a>(labels: &'a [DraftLabel], cache: &DestinationCache) -> Vec<&'a DraftLabel> {
    let mut pending: Vec<&DraftLabel> = Vec::new();
    for label in labels {
        if cache.has_label(&label.name) || pending.iter().any(|p| p.name == label.name) {
            continue;
        }
        pending.push(label);
    }
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn label(name: &str) -> DraftLabel {
        DraftLabel {
            name: name.to_string(),
            color: "eb5757".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_already_exists_error() {
        let errors = vec![json!({"resource": "Label", "code": "already_exists", "field": "name"})];
        assert!(errors_are_already_exists(&errors));
    }

    #[test]
    fn test_other_validation_errors() {
        assert!(!errors_are_already_exists(&[]));
        assert!(!errors_are_already_exists(&[json!({"resource": "Label", "code": "invalid", "field": "color"})]));
        assert!(!errors_are_already_exists(&[
            json!({"code": "already_exists"}),
            json!({"code": "invalid", "field": "color"}),
        ]));
    }

    #[test]
    fn test_labels_to_create_skips_cached_and_repeats() {
        let mut cache = DestinationCache::default();
        cache.remember_label("bug");
        let labels = vec![label("bug"), label("ui"), label("ui"), label("infra")];

        let names: Vec<&str> = labels_to_create(&labels, &cache)
            .into_iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["ui", "infra"]);
    }
}
