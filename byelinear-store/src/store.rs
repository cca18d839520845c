//! File-backed staging store
//!
//! Layout under the corpus root:
//! - `state.json`: the [`Checkpoint`], rewritten whole after every mutation
//! - `<human_key>.json`: one immutable file per fetched record

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::checkpoint::{Checkpoint, DestinationCache, StagedRecord, Summary};
use crate::{Error, Result};

/// Checkpoint file name inside the corpus root
pub const STATE_FILE: &str = "state.json";

/// Durable record-per-file store plus checkpoint
#[derive(Debug)]
pub struct StagingStore {
    root: PathBuf,
    checkpoint: Checkpoint,
    /// Remote ids of every staged record
    staged: HashSet<String>,
}

impl StagingStore {
    /// Open (or initialize) the store rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;

        let state_path = root.join(STATE_FILE);
        let checkpoint = match fs::read(&state_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
                path: state_path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Checkpoint::default(),
            Err(e) => return Err(Error::io(&state_path, e)),
        };

        let staged = checkpoint
            .records
            .iter()
            .map(|r| r.remote_id.clone())
            .collect();
        let store = Self {
            root,
            checkpoint,
            staged,
        };
        let summary = store.summary();
        info!(
            root = %store.root.display(),
            total = summary.total,
            exported = summary.exported,
            "Opened staging store"
        );
        Ok(store)
    }

    /// Corpus root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current in-memory checkpoint
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Destination lookups cached in the checkpoint
    pub fn cache(&self) -> &DestinationCache {
        &self.checkpoint.cache
    }

    /// Replace the destination cache; persisted with the next checkpoint write
    pub fn replace_cache(&mut self, cache: DestinationCache) {
        self.checkpoint.cache = cache;
    }

    /// Whether a record with this remote id is already staged
    pub fn contains_remote(&self, remote_id: &str) -> bool {
        self.staged.contains(remote_id)
    }

    /// Progress counts
    pub fn summary(&self) -> Summary {
        self.checkpoint.summary()
    }

    /// Stage a newly fetched record
    ///
    /// Writes the record file, appends it to the checkpoint and persists the
    /// checkpoint. A remote id that is already staged is rejected.
    pub fn append<T: Serialize>(&mut self, remote_id: &str, human_key: &str, record: &T) -> Result<()> {
        validate_key(human_key)?;
        if self.contains_remote(remote_id) {
            return Err(Error::Duplicate(remote_id.to_string()));
        }

        let bytes = serde_json::to_vec(record)?;
        write_atomic(&self.record_path(human_key), &bytes)?;

        self.checkpoint
            .records
            .push(StagedRecord::new(remote_id, human_key));
        self.staged.insert(remote_id.to_string());
        self.persist()?;

        debug!(key = human_key, "Staged record");
        Ok(())
    }

    /// Flag a staged record as exported and persist the checkpoint
    pub fn mark_exported(&mut self, human_key: &str) -> Result<()> {
        let record = self
            .checkpoint
            .records
            .iter_mut()
            .find(|r| r.human_key == human_key)
            .ok_or_else(|| Error::NotFound(human_key.to_string()))?;
        record.exported = true;

        self.persist()
    }

    /// Read back a staged record file
    pub fn load<T: DeserializeOwned>(&self, human_key: &str) -> Result<T> {
        validate_key(human_key)?;
        let path = self.record_path(human_key);
        let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Decode { path, source })
    }

    /// Rewrite the checkpoint file atomically
    pub fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.checkpoint)?;
        write_atomic(&self.root.join(STATE_FILE), &bytes)
    }

    fn record_path(&self, human_key: &str) -> PathBuf {
        self.root.join(format!("{}.json", human_key))
    }
}

fn validate_key(human_key: &str) -> Result<()> {
    let bad = human_key.is_empty()
        || human_key == STATE_FILE.trim_end_matches(".json")
        || human_key.starts_with('.')
        || human_key.contains(['/', '\\']);
    if bad {
        return Err(Error::InvalidKey(human_key.to_string()));
    }
    Ok(())
}

/// Write `bytes` to `path` so that a crash leaves either the old or the new
/// contents, never a torn file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");

    let mut file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
    file.write_all(bytes).map_err(|e| Error::io(&tmp, e))?;
    file.sync_all().map_err(|e| Error::io(&tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;

    // Make the rename itself durable
    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| Error::io(parent, e))?;
    }

    Ok(())
}
