// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Error taxonomy shared by the monitoring core

use std::path::PathBuf;
use thiserror::Error;

use crate::machine::Status;

/// A requested status change that the transition table does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid status transition from {from} to {to}")]
pub struct InvalidTransition {
    /// Status the machine was in
    pub from: Status,
    /// Status that was requested
    pub to: Status,
}

/// The aggregator was handed a window with no readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot aggregate an empty window")]
pub struct EmptyWindowError;

/// Unknown status name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status '{0}'")]
pub struct ParseStatusError(pub String);

/// Reading store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stream file I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reading on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("appended reading could not be read back from {path:?}")]
    NotReadBack { path: PathBuf },
}

/// Checkpoint persistence failures
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt checkpoint file {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to hand a metrics snapshot to its destination
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to encode metrics: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink '{name}' rejected the snapshot: {reason}")]
    Rejected { name: String, reason: String },
}

/// Failure of a single processing cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("reading store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    EmptyWindow(#[from] EmptyWindowError),

    #[error("metrics emission failed, checkpoint not advanced: {0}")]
    Sink(#[from] SinkError),

    #[error("metrics emitted but checkpoint not persisted: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Failure of a committed status change
#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("status change not recorded: {0}")]
    Store(#[from] StoreError),
}

/// Stream report failures
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no readings to analyze")]
    NoData,

    #[error(transparent)]
    Store(#[from] StoreError),
}
