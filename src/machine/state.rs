// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Authoritative current-status cell

use parking_lot::Mutex;
use std::sync::Arc;

use super::{Status, TransitionTable};
use crate::error::{MachineError, StoreError};
use crate::store::ReadingStore;

/// The machine's single current status.
///
/// There is no setter: every change goes through the transition table while the
/// lock is held, so the simulator and the request handler cannot lose each
/// other's updates. When backed by a reading stream, the status of the stream's
/// last reading is taken as current on every access, which keeps processes that
/// share one stream file in agreement.
pub struct MachineState {
    table: TransitionTable,
    current: Mutex<Status>,
    stream: Option<Arc<dyn ReadingStore>>,
}

impl MachineState {
    pub fn new(table: TransitionTable, initial: Status) -> Self {
        Self {
            table,
            current: Mutex::new(initial),
            stream: None,
        }
    }

    /// Follow the status recorded in `stream`; `initial` only applies while it is empty
    pub fn backed_by(mut self, stream: Arc<dyn ReadingStore>) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn current_status(&self) -> Status {
        let mut current = self.current.lock();
        // An unreadable stream leaves the last known status in place
        let _ = self.observe(&mut current);
        *current
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn observe(&self, current: &mut Status) -> Result<(), StoreError> {
        if let Some(stream) = &self.stream {
            if let Some(last) = stream.last()? {
                *current = last.status;
            }
        }
        Ok(())
    }

    /// Validate and apply a requested status change without recording it
    pub fn request_transition(&self, to: Status) -> Result<Status, MachineError> {
        self.commit(|_| to, |_, _| Ok(())).map(|(status, ())| status)
    }

    /// Choose, validate, record and commit a status change as one critical section.
    ///
    /// `choose` sees the current status and returns the requested one. `record`
    /// receives `(from, to)` once the table accepted the change; the new status is
    /// committed only if `record` succeeds.
    pub fn commit<T, C, R>(&self, choose: C, record: R) -> Result<(Status, T), MachineError>
    where
        C: FnOnce(Status) -> Status,
        R: FnOnce(Status, Status) -> Result<T, StoreError>,
    {
        let mut current = self.current.lock();
        self.observe(&mut current)?;

        let from = *current;
        let to = self.table.validate_transition(from, choose(from))?;
        let recorded = record(from, to)?;
        *current = to;
        Ok((to, recorded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidTransition;
    use crate::machine::Reading;
    use crate::store::{JsonlStore, MemoryStore};
    use std::thread;

    #[test]
    fn test_request_transition() {
        let machine = MachineState::new(TransitionTable::default(), Status::Shutdown);

        assert_eq!(machine.request_transition(Status::Started).unwrap(), Status::Started);
        assert_eq!(machine.request_transition(Status::Started).unwrap(), Status::Started);

        let err = machine.request_transition(Status::Paused).unwrap_err();
        assert!(matches!(
            err,
            MachineError::InvalidTransition(InvalidTransition { from: Status::Started, to: Status::Paused })
        ));
        assert_eq!(machine.current_status(), Status::Started);
    }

    #[test]
    fn test_failed_record_keeps_status() {
        let machine = MachineState::new(TransitionTable::default(), Status::Running);

        let result = machine.commit(
            |_| Status::Paused,
            |_, _| -> Result<(), StoreError> {
                Err(StoreError::Io {
                    path: "stream.jsonl".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                })
            },
        );

        assert!(matches!(result, Err(MachineError::Store(_))));
        assert_eq!(machine.current_status(), Status::Running);
    }

    #[test]
    fn test_rejected_transition_skips_record() {
        let machine = MachineState::new(TransitionTable::default(), Status::Completed);
        let mut recorded = false;

        let result = machine.commit(|_| Status::Paused, |_, _| {
            recorded = true;
            Ok(())
        });

        assert!(matches!(result, Err(MachineError::InvalidTransition(_))));
        assert!(!recorded);
    }

    #[test]
    fn test_concurrent_commits_see_each_other() {
        let machine = Arc::new(MachineState::new(TransitionTable::default(), Status::Running));

        // Each commit toggles RUNNING <-> PAUSED based on the status it observes;
        // a lost update would surface as an invalid transition.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let machine = machine.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        machine
                            .commit(
                                |current| match current {
                                    Status::Running => Status::Paused,
                                    _ => Status::Running,
                                },
                                |_, _| Ok(()),
                            )
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // 800 toggles from RUNNING end on RUNNING
        assert_eq!(machine.current_status(), Status::Running);
    }

    #[test]
    fn test_stream_backed_status_follows_other_writers() {
        let store = Arc::new(MemoryStore::new());
        let machine = MachineState::new(TransitionTable::default(), Status::Shutdown).backed_by(store.clone());
        assert_eq!(machine.current_status(), Status::Shutdown);

        store.append(Reading::now(25.0, 1500.0, Status::Started)).unwrap();
        store.append(Reading::now(30.0, 1500.0, Status::Running)).unwrap();
        assert_eq!(machine.current_status(), Status::Running);

        let (status, ()) = machine.commit(|_| Status::Paused, |_, _| Ok(())).unwrap();
        assert_eq!(status, Status::Paused);
    }

    #[test]
    fn test_commit_validates_against_shared_stream_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.jsonl");

        let api_store: Arc<dyn ReadingStore> = Arc::new(JsonlStore::open(&path).unwrap());
        let machine = MachineState::new(TransitionTable::default(), Status::Shutdown).backed_by(api_store.clone());

        let simulator_store = JsonlStore::open(&path).unwrap();
        simulator_store.append(Reading::now(25.0, 1500.0, Status::Started)).unwrap();
        simulator_store.append(Reading::now(30.0, 1500.0, Status::Running)).unwrap();

        let record = |_: Status, to: Status| api_store.append(Reading::now(30.0, 1500.0, to));

        // RUNNING -> STARTED is illegal even though this handle never saw RUNNING itself
        let err = machine.commit(|_| Status::Started, record).unwrap_err();
        assert!(matches!(
            err,
            MachineError::InvalidTransition(InvalidTransition { from: Status::Running, to: Status::Started })
        ));

        let (status, _) = machine.commit(|_| Status::Paused, record).unwrap();
        assert_eq!(status, Status::Paused);

        let statuses: Vec<Status> = simulator_store.all().unwrap().iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![Status::Started, Status::Running, Status::Paused]);
    }
}
