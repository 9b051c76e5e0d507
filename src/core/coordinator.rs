// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Processing cycle: ingest, aggregate, emit, checkpoint

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::RuntimeStats;
use crate::analysis::{Aggregator, ProcessedMetrics, Window};
use crate::error::{CheckpointError, CycleError};
use crate::store::{Checkpoint, CheckpointStore, ReadingStore};
use crate::streaming::MetricsSink;

/// Result of a cycle that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A snapshot was emitted and the checkpoint advanced
    Emitted(ProcessedMetrics),
    /// Nothing newer than the checkpoint
    NoNewData,
}

/// Runs processing cycles against a reading store.
///
/// Holds the only copy of the checkpoint that cycles read and advance. The lock
/// around it is held for a whole cycle, so overlapping calls run one after the
/// other and never advance from a stale base.
pub struct Coordinator {
    store: Arc<dyn ReadingStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    sink: Arc<dyn MetricsSink>,
    aggregator: Aggregator,
    window_size: usize,
    checkpoint: Mutex<Option<Checkpoint>>,
    stats: Arc<RuntimeStats>,
}

impl Coordinator {
    /// Build a coordinator, resuming from the persisted checkpoint if there is one
    pub fn new(
        store: Arc<dyn ReadingStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        sink: Arc<dyn MetricsSink>,
        aggregator: Aggregator,
        window_size: usize,
        stats: Arc<RuntimeStats>,
    ) -> Result<Self, CheckpointError> {
        let checkpoint = checkpoints.load()?;

        Ok(Self {
            store,
            checkpoints,
            sink,
            aggregator,
            window_size: window_size.max(1),
            checkpoint: Mutex::new(checkpoint),
            stats,
        })
    }

    pub fn checkpoint(&self) -> Option<Checkpoint> {
        *self.checkpoint.lock()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Run one cycle.
    ///
    /// The checkpoint moves only after the sink accepted the snapshot; a sink
    /// failure leaves it in place so the next cycle rebuilds the same window.
    pub fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let mut checkpoint = self.checkpoint.lock();
        let result = self.cycle(&mut checkpoint);

        match &result {
            Ok(CycleOutcome::Emitted(metrics)) => {
                self.stats.record_emitted();
                info!(
                    "Cycle emitted: {} readings, health {:.2}, status {} (mode {}, {} changes), {} alerts",
                    metrics.window_len,
                    metrics.health_score,
                    metrics.status.current,
                    metrics.status.mode,
                    metrics.status.changes,
                    metrics.alerts.len()
                );
            }
            Ok(CycleOutcome::NoNewData) => {
                self.stats.record_empty();
                debug!("No new readings since last checkpoint");
            }
            Err(CycleError::Checkpoint(e)) => {
                // The snapshot went out, so this still counts as an emission
                self.stats.record_emitted();
                warn!("Checkpoint not persisted, will retry on next advance: {}", e);
            }
            Err(e) => {
                self.stats.record_failed();
                warn!("Cycle failed, checkpoint unchanged: {}", e);
            }
        }

        result
    }

    fn cycle(&self, checkpoint: &mut Option<Checkpoint>) -> Result<CycleOutcome, CycleError> {
        let after = checkpoint.map(|c| c.timestamp);

        let fresh = self.store.readings_since(after)?;
        if fresh.is_empty() {
            return Ok(CycleOutcome::NoNewData);
        }

        // Membership always comes from the store's tail, never from what this
        // cycle happened to fetch.
        let window = Window::from_readings(self.window_size, self.store.latest(self.window_size)?);
        let metrics = self.aggregator.aggregate(&window, after)?;

        // Readings appended after the fetch but inside the window are consumed too
        let fetched_to = fresh.last().map(|r| r.timestamp);
        let consumed = fresh.len() + window.iter().filter(|r| Some(r.timestamp) > fetched_to).count();

        self.sink.emit(&metrics)?;

        let next = match *checkpoint {
            Some(current) => current.advance(metrics.window_end),
            None => Checkpoint::first(metrics.window_end),
        };
        *checkpoint = Some(next);
        self.stats.record_readings(consumed);

        self.checkpoints.save(&next)?;
        Ok(CycleOutcome::Emitted(metrics))
    }
}
