//! Checkpoint model
//!
//! The checkpoint is the single durable summary of a migration: every staged
//! record in discovery order plus destination lookups cached across runs.
//! Field names match the `state.json` layout so existing corpus directories
//! resume without conversion.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

/// Older state files store empty lists as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One discovered source record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedRecord {
    /// Source-assigned opaque id, used as the pagination anchor
    #[serde(rename = "id")]
    pub remote_id: String,

    /// Display key such as `ENG-42`, used for file names and logs
    #[serde(rename = "identifier")]
    pub human_key: String,

    /// Set once the destination issue and all its side effects exist
    #[serde(rename = "exported_to_github", default)]
    pub exported: bool,
}

impl StagedRecord {
    /// Create a not-yet-exported record
    pub fn new(remote_id: impl Into<String>, human_key: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            human_key: human_key.into(),
            exported: false,
        }
    }

    /// Whether the key carries the given tracker number (`ENG-42` matches 42)
    pub fn matches_number(&self, number: u64) -> bool {
        key_has_number(&self.human_key, number)
    }
}

/// Whether a human key such as `ENG-42` ends in the given number
pub fn key_has_number(human_key: &str, number: u64) -> bool {
    human_key
        .rsplit_once('-')
        .is_some_and(|(_, n)| n == number.to_string())
}

/// Resolved `Status` single-select field of a destination project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFieldInfo {
    /// Field node id
    pub id: String,
    #[serde(default)]
    pub todo_id: Option<String>,
    #[serde(default)]
    pub in_progress_id: Option<String>,
    #[serde(default)]
    pub done_id: Option<String>,
}

/// Cached destination project, keyed by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCache {
    pub name: String,
    /// Project node id
    pub id: String,
    /// Project number within the organization
    #[serde(default)]
    pub number: u64,
    /// Short description as last reconciled
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status_field_info: Option<StatusFieldInfo>,
}

/// Destination lookups cached in the checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationCache {
    /// Label names known to exist at the destination
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeSet<String>,

    /// Projects known to exist at the destination
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectCache>,
}

impl DestinationCache {
    /// Whether a label was already ensured
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains(name)
    }

    /// Remember an ensured label; returns false if it was already known
    pub fn remember_label(&mut self, name: impl Into<String>) -> bool {
        self.labels.insert(name.into())
    }

    /// Look up a cached project by name
    pub fn project(&self, name: &str) -> Option<&ProjectCache> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Drop a cached project so the next lookup resolves it again
    pub fn forget_project(&mut self, name: &str) -> Option<ProjectCache> {
        let index = self.projects.iter().position(|p| p.name == name)?;
        Some(self.projects.remove(index))
    }

    /// Insert or replace a project entry
    pub fn upsert_project(&mut self, project: ProjectCache) {
        match self.projects.iter_mut().find(|p| p.name == project.name) {
            Some(existing) => *existing = project,
            None => self.projects.push(project),
        }
    }
}

/// Progress counts derived from a checkpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub exported: usize,
    pub pending: usize,
}

/// Durable migration state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Staged records, newest first, in discovery order
    #[serde(rename = "issues", default, deserialize_with = "null_as_default")]
    pub records: Vec<StagedRecord>,

    #[serde(flatten)]
    pub cache: DestinationCache,
}

impl Checkpoint {
    /// Most recently appended record; its id is the next pagination cursor
    pub fn last_record(&self) -> Option<&StagedRecord> {
        self.records.last()
    }

    /// Find a staged record by human key
    pub fn find(&self, human_key: &str) -> Option<&StagedRecord> {
        self.records.iter().find(|r| r.human_key == human_key)
    }

    /// Count exported and pending records
    pub fn summary(&self) -> Summary {
        let exported = self.records.iter().filter(|r| r.exported).count();
        Summary {
            total: self.records.len(),
            exported,
            pending: self.records.len() - exported,
        }
    }
}
