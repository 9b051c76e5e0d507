// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Line-delimited JSON stream file

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{ReadingLog, ReadingStore};
use crate::error::StoreError;
use crate::machine::Reading;

/// Append-only stream file with one JSON reading per line.
///
/// The file is the source of truth: every read first picks up complete lines
/// appended since the last read, including lines written by other processes.
/// A trailing line without its newline is left for the next read.
pub struct JsonlStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    log: ReadingLog,
    offset: u64,
    line_no: usize,
}

impl JsonlStore {
    /// Open the stream file, creating it if needed, and load existing readings
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(&path, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;

        let store = Self {
            path,
            inner: Mutex::new(Inner::default()),
        };

        let loaded = {
            let mut inner = store.inner.lock();
            store.refresh(&mut inner)?;
            inner.log.len()
        };
        info!("Opened stream file {:?} ({} readings)", store.path, loaded);

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refresh(&self, inner: &mut Inner) -> Result<(), StoreError> {
        let mut file = File::open(&self.path).map_err(|e| io_error(&self.path, e))?;
        file.seek(SeekFrom::Start(inner.offset))
            .map_err(|e| io_error(&self.path, e))?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| io_error(&self.path, e))?;

        let Some(end) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(());
        };

        let mut added = 0;
        for line in buf[..end].split(|&b| b == b'\n') {
            inner.line_no += 1;
            let line = trim_ascii(line);
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<Reading>(line) {
                Ok(reading) => {
                    inner.log.push(reading);
                    added += 1;
                }
                Err(source) => {
                    let err = StoreError::Parse {
                        line: inner.line_no,
                        source,
                    };
                    warn!("Skipping record in {:?}: {}", self.path, err);
                }
            }
        }
        inner.offset += end as u64 + 1;

        if added > 0 {
            debug!("Picked up {} new readings from {:?}", added, self.path);
        }
        Ok(())
    }
}

impl ReadingStore for JsonlStore {
    fn append(&self, reading: Reading) -> Result<Reading, StoreError> {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner)?;

        let before = inner.log.len();
        let reading = inner.log.stamp(reading);
        let mut line = serde_json::to_string(&reading)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error(&self.path, e))?;

        // Bytes past the last newline are a record cut off mid-write
        let len = file.metadata().map_err(|e| io_error(&self.path, e))?.len();
        if len > inner.offset {
            warn!(
                "Stream file {:?} ends with {} bytes of an incomplete record, starting a new line",
                self.path,
                len - inner.offset
            );
            line.insert(0, '\n');
        }

        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| io_error(&self.path, e))?;

        self.refresh(&mut inner)?;
        if inner.log.len() <= before {
            return Err(StoreError::NotReadBack {
                path: self.path.clone(),
            });
        }
        Ok(reading)
    }

    fn readings_since(&self, after: Option<DateTime<Utc>>) -> Result<Vec<Reading>, StoreError> {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner)?;
        Ok(inner.log.since(after))
    }

    fn latest(&self, n: usize) -> Result<Vec<Reading>, StoreError> {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner)?;
        Ok(inner.log.latest(n))
    }

    fn len(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner)?;
        Ok(inner.log.len())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Status;

    #[test]
    fn test_append_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("stream.jsonl");

        {
            let store = JsonlStore::open(&path).unwrap();
            store.append(Reading::now(25.0, 1500.0, Status::Started)).unwrap();
            store.append(Reading::now(26.0, 1600.0, Status::Running)).unwrap();
        }

        let store = JsonlStore::open(&path).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].status, Status::Running);
        assert!(all[0].timestamp < all[1].timestamp);
    }

    #[test]
    fn test_partial_line_is_not_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.jsonl");
        let store = JsonlStore::open(&path).unwrap();
        let first = store.append(Reading::now(25.0, 1500.0, Status::Running)).unwrap();

        let mut line = serde_json::to_string(&Reading::new(
            first.timestamp + chrono::Duration::seconds(1),
            27.0,
            1700.0,
            Status::Paused,
        ))
        .unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&line.as_bytes()[..10]).unwrap();
        assert_eq!(store.len().unwrap(), 1);

        line.push('\n');
        file.write_all(&line.as_bytes()[10..]).unwrap();
        let since = store.readings_since(Some(first.timestamp)).unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].status, Status::Paused);
    }

    #[test]
    fn test_append_after_torn_record_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.jsonl");
        std::fs::write(&path, "{\"timestamp\":\"2026-01-01T00:00:00Z\",\"temp").unwrap();

        let store = JsonlStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 0);

        let first = store.append(Reading::now(25.0, 1500.0, Status::Started)).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        store.append(Reading::now(26.0, 1600.0, Status::Running)).unwrap();

        let reopened = JsonlStore::open(&path).unwrap();
        let all = reopened.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(all[1].status, Status::Running);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.jsonl");
        std::fs::write(
            &path,
            "{\"timestamp\":\"2026-01-01T00:00:00Z\",\"temperature\":20.0,\"speed\":1200.0,\"status\":\"RUNNING\"}\n\
             not json\n\
             \n",
        )
        .unwrap();

        let store = JsonlStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_second_handle_sees_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.jsonl");
        let writer = JsonlStore::open(&path).unwrap();
        let reader = JsonlStore::open(&path).unwrap();

        writer.append(Reading::now(25.0, 1500.0, Status::Running)).unwrap();
        assert_eq!(reader.latest(5).unwrap().len(), 1);
    }
}
