//! Processed metrics snapshot

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Trend;
use crate::machine::Status;

/// Derived statistics for one numeric field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub current: f64,
    pub moving_avg: f64,
    pub trend: Trend,
    /// Current value lies outside the normal range
    pub is_outlier: bool,
}

/// Status summary over the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStats {
    pub current: Status,
    pub mode: Status,
    /// Adjacent pairs in the window with differing status
    pub changes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Operational notice about the machine status
    Notice,
    /// Value outside its normal range
    Warning,
    /// Value outside its alert range
    Fault,
}

/// Advisory message attached to a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Immutable result of one processing cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedMetrics {
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub window_len: usize,
    /// Readings in the window newer than the previous emission
    pub new_readings: usize,
    pub temperature: FieldStats,
    pub speed: FieldStats,
    pub status: StatusStats,
    pub health_score: f64,
    pub alerts: Vec<Alert>,
}
