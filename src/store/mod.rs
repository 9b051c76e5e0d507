//! Reading store and checkpoint persistence

mod checkpoint;
mod jsonl;
mod memory;

pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpoint, MemoryCheckpoint};
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::machine::Reading;

/// Append-only, timestamp-ordered sequence of raw readings.
///
/// Implementations must make each append atomic: a concurrent reader sees either
/// the whole record or nothing.
pub trait ReadingStore: Send + Sync {
    /// Append a reading and return it as stored
    fn append(&self, reading: Reading) -> Result<Reading, StoreError>;

    /// All readings strictly newer than `after`, oldest first
    fn readings_since(&self, after: Option<DateTime<Utc>>) -> Result<Vec<Reading>, StoreError>;

    /// The `n` most recent readings, oldest first
    fn latest(&self, n: usize) -> Result<Vec<Reading>, StoreError>;

    /// Every stored reading, oldest first
    fn all(&self) -> Result<Vec<Reading>, StoreError> {
        self.readings_since(None)
    }

    fn last(&self) -> Result<Option<Reading>, StoreError> {
        Ok(self.latest(1)?.pop())
    }

    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// In-memory ordered log shared by the store implementations
#[derive(Debug, Default)]
pub(crate) struct ReadingLog {
    readings: Vec<Reading>,
}

impl ReadingLog {
    /// Stamp `reading` so timestamps stay strictly increasing, then push it.
    ///
    /// A reading that is not newer than the last one is moved one microsecond
    /// past it, so arrival order breaks ties and no reading can hide behind a
    /// checkpoint equal to its timestamp.
    pub fn push(&mut self, reading: Reading) -> Reading {
        let reading = self.stamp(reading);
        self.readings.push(reading.clone());
        reading
    }

    /// Apply the ordering rule of `push` without storing the reading
    pub fn stamp(&self, mut reading: Reading) -> Reading {
        if let Some(last) = self.readings.last() {
            if reading.timestamp <= last.timestamp {
                reading.timestamp = last.timestamp + Duration::microseconds(1);
            }
        }
        reading
    }

    pub fn since(&self, after: Option<DateTime<Utc>>) -> Vec<Reading> {
        let start = match after {
            Some(ts) => self.readings.partition_point(|r| r.timestamp <= ts),
            None => 0,
        };
        self.readings[start..].to_vec()
    }

    pub fn latest(&self, n: usize) -> Vec<Reading> {
        let start = self.readings.len().saturating_sub(n);
        self.readings[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }
}
