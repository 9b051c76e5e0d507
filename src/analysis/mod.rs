//! Analysis module - windowed aggregation, trends, health scoring and reports

mod health;
mod metrics;
mod report;
mod trend;
mod window;

pub use health::{generate_alerts, health_score};
pub use metrics::{Alert, AlertLevel, FieldStats, ProcessedMetrics, StatusStats};
pub use report::{DeviationAnomaly, Field, StreamReport};
pub use trend::{classify_trend, Trend};
pub use window::Window;

use chrono::{DateTime, Utc};

use crate::config::{AnalysisConfig, FieldLimits};
use crate::error::EmptyWindowError;
use crate::machine::{Reading, Status};

/// Most frequent status; ties go to the status seen first in the window
pub fn status_mode(statuses: &[Status]) -> Option<Status> {
    let mut counts: Vec<(Status, usize)> = Vec::with_capacity(Status::ALL.len());
    for &status in statuses {
        match counts.iter_mut().find(|(s, _)| *s == status) {
            Some((_, count)) => *count += 1,
            None => counts.push((status, 1)),
        }
    }

    let mut best: Option<(Status, usize)> = None;
    for (status, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((status, count));
        }
    }
    best.map(|(status, _)| status)
}

/// Number of adjacent pairs whose status differs
pub fn status_changes(statuses: &[Status]) -> usize {
    statuses.windows(2).filter(|pair| pair[0] != pair[1]).count()
}

/// Stateless window aggregator
#[derive(Debug, Clone)]
pub struct Aggregator {
    config: AnalysisConfig,
}

impl Aggregator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Aggregate `window`, stamping the snapshot with the current time.
    ///
    /// `previous_emit` is the window end of the previous emitted snapshot and only
    /// feeds `new_readings`.
    pub fn aggregate(
        &self,
        window: &Window,
        previous_emit: Option<DateTime<Utc>>,
    ) -> Result<ProcessedMetrics, EmptyWindowError> {
        self.aggregate_at(window, previous_emit, Utc::now())
    }

    /// Same as [`aggregate`](Self::aggregate) with an explicit generation time
    pub fn aggregate_at(
        &self,
        window: &Window,
        previous_emit: Option<DateTime<Utc>>,
        generated_at: DateTime<Utc>,
    ) -> Result<ProcessedMetrics, EmptyWindowError> {
        let (Some(first), Some(current)) = (window.first(), window.last()) else {
            return Err(EmptyWindowError);
        };

        let statuses: Vec<Status> = window.iter().map(|r| r.status).collect();
        let changes = status_changes(&statuses);
        let mode = status_mode(&statuses).unwrap_or(current.status);

        let new_readings = match previous_emit {
            Some(ts) => window.iter().filter(|r| r.timestamp > ts).count(),
            None => window.len(),
        };

        Ok(ProcessedMetrics {
            generated_at,
            window_start: first.timestamp,
            window_end: current.timestamp,
            window_len: window.len(),
            new_readings,
            temperature: self.field_stats(window, |r| r.temperature, &self.config.temperature),
            speed: self.field_stats(window, |r| r.speed, &self.config.speed),
            status: StatusStats {
                current: current.status,
                mode,
                changes,
            },
            health_score: health_score(window, changes, &self.config),
            alerts: generate_alerts(current, &self.config),
        })
    }

    fn field_stats(&self, window: &Window, field: fn(&Reading) -> f64, limits: &FieldLimits) -> FieldStats {
        let values = window.values(field);
        let current = values.last().copied().unwrap_or_default();

        FieldStats {
            current,
            moving_avg: trend::mean(&values),
            trend: classify_trend(&values, self.config.trend_epsilon),
            is_outlier: !limits.normal.contains(current),
        }
    }
}
