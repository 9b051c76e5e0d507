//! Core module - processing cycle, task scheduling and engine wiring

mod coordinator;
mod engine;
mod scheduler;

pub use coordinator::{Coordinator, CycleOutcome};
pub use engine::{Engine, RunMode};
pub use scheduler::Scheduler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Process-wide counters shared by the engine, the coordinator and the API
#[derive(Debug)]
pub struct RuntimeStats {
    running: AtomicBool,
    readings_generated: AtomicU64,
    readings_processed: AtomicU64,
    cycles_emitted: AtomicU64,
    cycles_empty: AtomicU64,
    cycles_failed: AtomicU64,
    started_at: DateTime<Utc>,
}

/// Point-in-time copy of [`RuntimeStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub running: bool,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub cycles_run: u64,
    pub readings_generated: u64,
    pub readings_processed: u64,
    pub cycles_emitted: u64,
    pub cycles_empty: u64,
    pub cycles_failed: u64,
}

impl RuntimeStats {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            readings_generated: AtomicU64::new(0),
            readings_processed: AtomicU64::new(0),
            cycles_emitted: AtomicU64::new(0),
            cycles_empty: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn record_generated(&self) {
        self.readings_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_readings(&self, count: usize) {
        self.readings_processed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_emitted(&self) {
        self.cycles_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty(&self) {
        self.cycles_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let cycles_emitted = self.cycles_emitted.load(Ordering::Relaxed);
        let cycles_empty = self.cycles_empty.load(Ordering::Relaxed);
        let cycles_failed = self.cycles_failed.load(Ordering::Relaxed);

        StatsSnapshot {
            running: self.is_running(),
            started_at: self.started_at,
            uptime_seconds: self.uptime_seconds(),
            cycles_run: cycles_emitted + cycles_empty + cycles_failed,
            readings_generated: self.readings_generated.load(Ordering::Relaxed),
            readings_processed: self.readings_processed.load(Ordering::Relaxed),
            cycles_emitted,
            cycles_empty,
            cycles_failed,
        }
    }
}

impl Default for RuntimeStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = RuntimeStats::new();
        stats.record_generated();
        stats.record_generated();
        stats.record_readings(5);
        stats.record_emitted();
        stats.record_empty();
        stats.set_running(true);

        let snap = stats.snapshot();
        assert!(snap.running);
        assert_eq!(snap.readings_generated, 2);
        assert_eq!(snap.readings_processed, 5);
        assert_eq!(snap.cycles_emitted, 1);
        assert_eq!(snap.cycles_empty, 1);
        assert_eq!(snap.cycles_failed, 0);
        assert_eq!(snap.cycles_run, 2);
    }
}
