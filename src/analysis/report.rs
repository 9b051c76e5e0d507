//! Whole-stream statistics and deviation anomalies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::trend::mean;
use crate::error::ReportError;
use crate::machine::Reading;
use crate::store::ReadingStore;

/// Numeric reading field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Temperature,
    Speed,
}

impl Field {
    pub fn value(&self, reading: &Reading) -> f64 {
        match self {
            Field::Temperature => reading.temperature,
            Field::Speed => reading.speed,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Speed => "speed",
        }
    }
}

/// Reading that strays too far from the stream mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationAnomaly {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub deviation_pct: f64,
}

/// Summary of one field across the whole stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamReport {
    pub field: Field,
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub data_points: usize,
    pub threshold_pct: f64,
    pub anomalies: Vec<DeviationAnomaly>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl StreamReport {
    /// Summarize `field` and flag readings deviating more than `threshold_pct`
    /// percent from the mean
    pub fn analyze(readings: &[Reading], field: Field, threshold_pct: f64) -> Result<Self, ReportError> {
        if readings.is_empty() {
            return Err(ReportError::NoData);
        }

        let values: Vec<f64> = readings.iter().map(|r| field.value(r)).collect();
        let avg = mean(&values);
        let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);

        let anomalies = if avg.abs() < 1e-10 {
            Vec::new()
        } else {
            readings
                .iter()
                .zip(&values)
                .filter_map(|(reading, &value)| {
                    let deviation_pct = (value - avg).abs() / avg.abs() * 100.0;
                    (deviation_pct > threshold_pct).then(|| DeviationAnomaly {
                        timestamp: reading.timestamp,
                        value: round2(value),
                        deviation_pct: round2(deviation_pct),
                    })
                })
                .collect()
        };

        Ok(Self {
            field,
            average: round2(avg),
            maximum: round2(maximum),
            minimum: round2(minimum),
            data_points: values.len(),
            threshold_pct,
            anomalies,
        })
    }

    /// Analyze every reading currently in `store`
    pub fn from_store(store: &dyn ReadingStore, field: Field, threshold_pct: f64) -> Result<Self, ReportError> {
        let readings = store.all()?;
        Self::analyze(&readings, field, threshold_pct)
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }

    /// Plain-text summary with values labelled in `unit`
    pub fn render(&self, unit: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} analysis:", self.field.name());
        let _ = writeln!(out, "  average:     {} {}", self.average, unit);
        let _ = writeln!(out, "  maximum:     {} {}", self.maximum, unit);
        let _ = writeln!(out, "  minimum:     {} {}", self.minimum, unit);
        let _ = writeln!(out, "  data points: {}", self.data_points);
        let _ = writeln!(
            out,
            "  anomalies:   {} (deviation > {}% from the mean)",
            self.anomaly_count(),
            self.threshold_pct
        );
        for anomaly in &self.anomalies {
            let _ = writeln!(
                out,
                "    {}  {} {}  ({}%)",
                anomaly.timestamp.to_rfc3339(),
                anomaly.value,
                unit,
                anomaly.deviation_pct
            );
        }
        out
    }
}
