//! Staging store for byelinear
//!
//! Persists fetched source records one file per record, plus a checkpoint
//! describing every staged record and cached destination lookups. Every write
//! goes through write-temp, fsync, rename so a crash never leaves a torn file.

pub mod checkpoint;
pub mod error;
pub mod store;

pub use checkpoint::{
    key_has_number, Checkpoint, DestinationCache, ProjectCache, StagedRecord, StatusFieldInfo,
    Summary,
};
pub use error::{Error, Result};
pub use store::{StagingStore, STATE_FILE};
