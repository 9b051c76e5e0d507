//! In-memory reading store

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{ReadingLog, ReadingStore};
use crate::error::StoreError;
use crate::machine::Reading;

/// Reading store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    log: RwLock<ReadingLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadingStore for MemoryStore {
    fn append(&self, reading: Reading) -> Result<Reading, StoreError> {
        Ok(self.log.write().push(reading))
    }

    fn readings_since(&self, after: Option<DateTime<Utc>>) -> Result<Vec<Reading>, StoreError> {
        Ok(self.log.read().since(after))
    }

    fn latest(&self, n: usize) -> Result<Vec<Reading>, StoreError> {
        Ok(self.log.read().latest(n))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.log.read().len())
    }
}
