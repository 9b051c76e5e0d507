//! Streaming module - destinations for processed metrics

mod export;

pub use export::{CsvSink, MetricsRow};

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::analysis::ProcessedMetrics;
use crate::error::SinkError;

/// Destination of processed metrics.
///
/// `emit` is synchronous: when it returns `Ok` the snapshot has been handed over
/// durably and the caller may advance its checkpoint.
pub trait MetricsSink: Send + Sync {
    fn name(&self) -> &str;

    fn emit(&self, metrics: &ProcessedMetrics) -> Result<(), SinkError>;
}

/// Where readers such as the API get the most recent snapshot from
pub trait MetricsSource: Send + Sync {
    fn latest(&self) -> Result<Option<ProcessedMetrics>, SinkError>;
}

/// Most recent snapshot emitted by this process
#[derive(Default)]
pub struct LatestMetrics {
    latest: RwLock<Option<ProcessedMetrics>>,
}

impl LatestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(metrics: Option<ProcessedMetrics>) -> Self {
        Self {
            latest: RwLock::new(metrics),
        }
    }

    pub fn get(&self) -> Option<ProcessedMetrics> {
        self.latest.read().clone()
    }
}

impl MetricsSink for LatestMetrics {
    fn name(&self) -> &str {
        "latest"
    }

    fn emit(&self, metrics: &ProcessedMetrics) -> Result<(), SinkError> {
        *self.latest.write() = Some(metrics.clone());
        Ok(())
    }
}

impl MetricsSource for LatestMetrics {
    fn latest(&self) -> Result<Option<ProcessedMetrics>, SinkError> {
        Ok(self.get())
    }
}

/// Logs each snapshot as pretty JSON
pub struct LogSink;

impl MetricsSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn emit(&self, metrics: &ProcessedMetrics) -> Result<(), SinkError> {
        let json = serde_json::to_string_pretty(metrics)?;
        info!("Processed window:\n{}", json);
        Ok(())
    }
}

/// Emits to every sink in order; the first failure aborts the emission
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MetricsSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    fn emit(&self, metrics: &ProcessedMetrics) -> Result<(), SinkError> {
        for sink in &self.sinks {
            sink.emit(metrics).map_err(|e| SinkError::Rejected {
                name: sink.name().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
