// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Machine Monitor - simulated machine telemetry with windowed analytics
//!
//! A simulator appends temperature, speed and status readings to an append-only
//! stream. A coordinator periodically folds the newest readings into a fixed-size
//! window, derives moving averages, trends, a health score and alerts, hands the
//! snapshot to its sinks and only then advances a durable checkpoint, so every
//! reading is processed and no snapshot is emitted twice across restarts.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐  append   ┌──────────────┐  since(checkpoint)  ┌─────────────┐
//! │ Simulator │ ────────→ │ ReadingStore │ ──────────────────→ │ Coordinator │
//! └───────────┘           └──────────────┘                     └─────────────┘
//!       │                        ↑                                    │
//!       ↓                        │ append                             ↓ aggregate
//! ┌──────────────┐  commit  ┌─────────┐                       ┌────────────┐
//! │ MachineState │ ←─────── │   API   │ ←──── latest ──────── │   Sinks    │
//! └──────────────┘          └─────────┘                       └────────────┘
//! ```

pub mod analysis;
pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod machine;
pub mod sensors;
pub mod store;
pub mod streaming;

// Re-exports for convenience
pub use analysis::{Aggregator, ProcessedMetrics, StreamReport, Window};
pub use config::Config;
pub use core::{Coordinator, CycleOutcome, Engine, RunMode};
pub use error::{CycleError, InvalidTransition};
pub use machine::{MachineState, Reading, Status, TransitionTable};
pub use store::{Checkpoint, CheckpointStore, ReadingStore};
pub use streaming::MetricsSink;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Display name
pub const NAME: &str = "Machine Monitor";
