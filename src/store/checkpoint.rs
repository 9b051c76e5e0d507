// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Processed-so-far checkpoint

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::CheckpointError;

/// Timestamp of the last reading folded into an emitted metrics row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub timestamp: DateTime<Utc>,
    /// Bumped on every advance
    pub version: u64,
}

impl Checkpoint {
    pub fn first(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            version: 1,
        }
    }

    /// Successor checkpoint; never moves backwards in time
    pub fn advance(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: timestamp.max(self.timestamp),
            version: self.version + 1,
        }
    }
}

/// Durable home of the checkpoint
pub trait CheckpointStore: Send + Sync {
    /// `None` until the first cycle has been emitted
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Replace the stored checkpoint atomically
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// Checkpoint kept in memory only
#[derive(Debug, Default)]
pub struct MemoryCheckpoint {
    value: Mutex<Option<Checkpoint>>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(*self.value.lock())
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        *self.value.lock() = Some(*checkpoint);
        Ok(())
    }
}

/// Checkpoint file replaced by write-then-rename, so a crash leaves either the
/// old or the new value on disk
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CheckpointStore for FileCheckpoint {
    fn load(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|source| CheckpointError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        info!(
            "Resuming after checkpoint {} (v{})",
            checkpoint.timestamp.to_rfc3339(),
            checkpoint.version
        );
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let content = serde_json::to_vec(checkpoint).map_err(|source| CheckpointError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp).map_err(|e| self.io_error(e))?;
        file.write_all(&content)
            .and_then(|_| file.sync_all())
            .map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!("Checkpoint v{} saved", checkpoint.version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_file_means_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpoint::new(dir.path().join("last_processed.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_replaces_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("last_processed.json");
        let store = FileCheckpoint::new(&path);

        let first = Checkpoint::first(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        store.save(&first).unwrap();
        let second = first.advance(Utc.timestamp_opt(1_700_000_010, 0).unwrap());
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_processed.json");
        std::fs::write(&path, "2026-01-01T00:00:00").unwrap();

        let err = FileCheckpoint::new(&path).load().unwrap_err();
        assert!(matches!(err, CheckpointError::Corrupt { .. }));
    }

    #[test]
    fn test_advance_never_goes_back() {
        let later = Checkpoint::first(Utc.timestamp_opt(1_700_000_100, 0).unwrap());
        let next = later.advance(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(next.timestamp, later.timestamp);
        assert_eq!(next.version, 2);
    }
}
