//! Tabular export of processed metrics

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{MetricsSink, MetricsSource};
use crate::analysis::{Alert, FieldStats, ProcessedMetrics, StatusStats, Trend};
use crate::error::SinkError;
use crate::machine::Status;

/// One flattened CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub window_len: usize,
    pub new_readings: usize,
    pub temperature_current: f64,
    pub temperature_moving_avg: f64,
    pub temperature_trend: Trend,
    pub temperature_is_outlier: bool,
    pub speed_current: f64,
    pub speed_moving_avg: f64,
    pub speed_trend: Trend,
    pub speed_is_outlier: bool,
    pub status_current: Status,
    pub status_mode: Status,
    pub status_changes: usize,
    pub health_score: f64,
    /// JSON array of alerts
    pub alerts: String,
}

impl MetricsRow {
    pub fn from_metrics(metrics: &ProcessedMetrics) -> Result<Self, SinkError> {
        Ok(Self {
            generated_at: metrics.generated_at,
            window_start: metrics.window_start,
            window_end: metrics.window_end,
            window_len: metrics.window_len,
            new_readings: metrics.new_readings,
            temperature_current: metrics.temperature.current,
            temperature_moving_avg: metrics.temperature.moving_avg,
            temperature_trend: metrics.temperature.trend,
            temperature_is_outlier: metrics.temperature.is_outlier,
            speed_current: metrics.speed.current,
            speed_moving_avg: metrics.speed.moving_avg,
            speed_trend: metrics.speed.trend,
            speed_is_outlier: metrics.speed.is_outlier,
            status_current: metrics.status.current,
            status_mode: metrics.status.mode,
            status_changes: metrics.status.changes,
            health_score: metrics.health_score,
            alerts: serde_json::to_string(&metrics.alerts)?,
        })
    }

    pub fn into_metrics(self) -> Result<ProcessedMetrics, serde_json::Error> {
        let alerts: Vec<Alert> = serde_json::from_str(&self.alerts)?;
        Ok(ProcessedMetrics {
            generated_at: self.generated_at,
            window_start: self.window_start,
            window_end: self.window_end,
            window_len: self.window_len,
            new_readings: self.new_readings,
            temperature: FieldStats {
                current: self.temperature_current,
                moving_avg: self.temperature_moving_avg,
                trend: self.temperature_trend,
                is_outlier: self.temperature_is_outlier,
            },
            speed: FieldStats {
                current: self.speed_current,
                moving_avg: self.speed_moving_avg,
                trend: self.speed_trend,
                is_outlier: self.speed_is_outlier,
            },
            status: StatusStats {
                current: self.status_current,
                mode: self.status_mode,
                changes: self.status_changes,
            },
            health_score: self.health_score,
            alerts,
        })
    }
}

/// Appends one row per snapshot to a CSV file
pub struct CsvSink {
    path: PathBuf,
    writer: Mutex<Option<csv::Writer<File>>>,
    rows_written: Mutex<usize>,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self {
            path,
            writer: Mutex::new(None),
            rows_written: Mutex::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        *self.rows_written.lock()
    }

    fn open_writer(&self) -> Result<csv::Writer<File>, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        info!("Writing processed metrics to {:?}", self.path);
        Ok(csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file))
    }

    /// Last complete row of the file, if any
    pub fn last_row(&self) -> Result<Option<ProcessedMetrics>, SinkError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut last = None;
        for row in reader.deserialize::<MetricsRow>() {
            match row {
                Ok(row) => last = Some(row),
                Err(e) => warn!("Skipping unreadable metrics row in {:?}: {}", self.path, e),
            }
        }

        last.map(MetricsRow::into_metrics)
            .transpose()
            .map_err(SinkError::from)
    }
}

impl MetricsSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn emit(&self, metrics: &ProcessedMetrics) -> Result<(), SinkError> {
        let row = MetricsRow::from_metrics(metrics)?;

        let mut writer_lock = self.writer.lock();
        if writer_lock.is_none() {
            *writer_lock = Some(self.open_writer()?);
        }

        if let Some(ref mut writer) = *writer_lock {
            let written = writer.serialize(&row).map_err(SinkError::from).and_then(|_| {
                writer.flush()?;
                Ok(())
            });
            if let Err(e) = written {
                // Reopen on the next emit rather than reuse a writer in an unknown state
                *writer_lock = None;
                return Err(e);
            }
        }

        *self.rows_written.lock() += 1;
        debug!("Appended metrics row for window ending {}", metrics.window_end.to_rfc3339());
        Ok(())
    }
}

/// Reads the table itself, so rows appended by another process are seen
impl MetricsSource for CsvSink {
    fn latest(&self) -> Result<Option<ProcessedMetrics>, SinkError> {
        self.last_row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AlertLevel;
    use chrono::TimeZone;

    fn sample(health: f64) -> ProcessedMetrics {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let stats = FieldStats {
            current: 25.0,
            moving_avg: 24.5,
            trend: Trend::Increasing,
            is_outlier: false,
        };
        ProcessedMetrics {
            generated_at: ts,
            window_start: ts,
            window_end: ts,
            window_len: 5,
            new_readings: 5,
            temperature: stats,
            speed: FieldStats { current: 900.0, is_outlier: true, ..stats },
            status: StatusStats {
                current: Status::Paused,
                mode: Status::Running,
                changes: 1,
            },
            health_score: health,
            alerts: vec![Alert::new(AlertLevel::Notice, "Machine paused - may require attention")],
        }
    }

    #[test]
    fn test_header_written_once_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("metrics.csv");

        CsvSink::new(&path).unwrap().emit(&sample(0.5)).unwrap();
        let sink = CsvSink::new(&path).unwrap();
        sink.emit(&sample(0.75)).unwrap();
        assert_eq!(sink.rows_written(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("generated_at").count(), 1);
        assert_eq!(content.lines().count(), 3);

        let last = sink.last_row().unwrap().unwrap();
        assert_eq!(last, sample(0.75));
    }

    #[test]
    fn test_source_sees_rows_from_another_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        let reader = CsvSink::new(&path).unwrap();
        assert!(reader.latest().unwrap().is_none());

        CsvSink::new(&path).unwrap().emit(&sample(0.5)).unwrap();
        assert_eq!(reader.latest().unwrap(), Some(sample(0.5)));

        CsvSink::new(&path).unwrap().emit(&sample(0.25)).unwrap();
        assert_eq!(reader.latest().unwrap().map(|m| m.health_score), Some(0.25));
    }

    #[test]
    fn test_last_row_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("metrics.csv")).unwrap();
        assert!(sink.last_row().unwrap().is_none());
    }
}
