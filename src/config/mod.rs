// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::machine::{Status, TransitionTable};

/// Default trend threshold; mean differences at or below this are "stable"
pub const DEFAULT_TREND_EPSILON: f64 = 0.1;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Data directory; relative storage paths resolve against it
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Emit logs as JSON lines
    pub json_logs: bool,

    /// Directory for daily-rolled JSON log files; none disables file logging
    pub log_dir: Option<PathBuf>,

    /// Simulator configuration
    pub simulation: SimulationConfig,

    /// Processing cycle configuration
    pub processing: ProcessingConfig,

    /// Window analysis configuration
    pub analysis: AnalysisConfig,

    /// Status state machine configuration
    pub machine: MachineConfig,

    /// HTTP API configuration
    pub api: ApiConfig,

    /// File locations
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "machine-monitor".to_string(),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            json_logs: false,
            log_dir: Some(PathBuf::from("logs")),
            simulation: SimulationConfig::default(),
            processing: ProcessingConfig::default(),
            analysis: AnalysisConfig::default(),
            machine: MachineConfig::default(),
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("machine-monitor"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.processing.window_size == 0 {
            bail!("processing.window_size must be at least 1");
        }
        if self.simulation.interval_ms == 0 || self.processing.interval_secs == 0 {
            bail!("simulation and processing intervals must be non-zero");
        }
        if !(self.analysis.trend_epsilon > 0.0) {
            bail!("analysis.trend_epsilon must be positive");
        }
        self.analysis.temperature.validate("temperature")?;
        self.analysis.speed.validate("speed")?;
        self.analysis.health.validate()?;
        Ok(())
    }

    pub fn stream_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.stream_file)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.checkpoint_file)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.metrics_csv)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|dir| self.data_dir.join(dir))
    }
}

/// Simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Milliseconds between generated readings
    pub interval_ms: u64,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Processing cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Seconds between processing cycles
    pub interval_secs: u64,

    /// Number of most recent readings aggregated per cycle
    pub window_size: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            window_size: 5,
        }
    }
}

impl ProcessingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    fn encloses(&self, other: &ValueRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }
}

/// Limits for one numeric field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldLimits {
    /// Display unit
    pub unit: String,

    /// Expected operating range
    pub normal: ValueRange,

    /// Hard fault range; always encloses `normal`
    pub alert: ValueRange,
}

impl FieldLimits {
    fn validate(&self, field: &str) -> Result<()> {
        if self.normal.min > self.normal.max || self.alert.min > self.alert.max {
            bail!("{field}: range bounds are inverted");
        }
        if !self.alert.encloses(&self.normal) {
            bail!("{field}: alert range must enclose the normal range");
        }
        Ok(())
    }
}

/// Desirability of the current status, each in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusScores {
    pub started: f64,
    pub running: f64,
    pub paused: f64,
    pub completed: f64,
    pub shutdown: f64,
}

impl Default for StatusScores {
    fn default() -> Self {
        Self {
            started: 0.8,
            running: 1.0,
            paused: 0.6,
            completed: 0.9,
            shutdown: 0.5,
        }
    }
}

impl StatusScores {
    pub fn score(&self, status: Status) -> f64 {
        match status {
            Status::Started => self.started,
            Status::Running => self.running,
            Status::Paused => self.paused,
            Status::Completed => self.completed,
            Status::Shutdown => self.shutdown,
        }
    }
}

/// Health score weighting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthWeights {
    /// Weight of the in-normal-range fraction
    pub range_weight: f64,

    /// Weight of the current status desirability
    pub status_weight: f64,

    /// Deducted once per status change inside the window
    pub change_penalty: f64,

    pub status_scores: StatusScores,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            range_weight: 0.7,
            status_weight: 0.3,
            change_penalty: 0.05,
            status_scores: StatusScores::default(),
        }
    }
}

impl HealthWeights {
    fn validate(&self) -> Result<()> {
        let s = &self.status_scores;
        let values = [
            self.range_weight,
            self.status_weight,
            self.change_penalty,
            s.started,
            s.running,
            s.paused,
            s.completed,
            s.shutdown,
        ];
        if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
            bail!("health weights and status scores must lie in [0, 1]");
        }
        Ok(())
    }
}

/// Window analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub temperature: FieldLimits,
    pub speed: FieldLimits,

    /// Minimum half-window mean difference classified as a trend
    pub trend_epsilon: f64,

    pub health: HealthWeights,

    /// Deviation from the stream mean, in percent, reported by `--report`
    pub anomaly_threshold_pct: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            temperature: FieldLimits {
                unit: "Celsius".to_string(),
                normal: ValueRange::new(15.0, 35.0),
                alert: ValueRange::new(10.0, 40.0),
            },
            speed: FieldLimits {
                unit: "RPM".to_string(),
                normal: ValueRange::new(1000.0, 2000.0),
                alert: ValueRange::new(800.0, 2200.0),
            },
            trend_epsilon: DEFAULT_TREND_EPSILON,
            health: HealthWeights::default(),
            anomaly_threshold_pct: 20.0,
        }
    }
}

/// Status state machine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Status used when the stream holds no readings yet
    pub initial_status: Status,

    pub transitions: TransitionTable,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            initial_status: Status::Shutdown,
            transitions: TransitionTable::default(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// File locations, relative to `data_dir` unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Line-delimited raw readings
    pub stream_file: PathBuf,

    /// Latest processed checkpoint
    pub checkpoint_file: PathBuf,

    /// Processed metrics table
    pub metrics_csv: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            stream_file: PathBuf::from("stream_output.jsonl"),
            checkpoint_file: PathBuf::from("last_processed.json"),
            metrics_csv: PathBuf::from("processed_metrics.csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        let mut config = Config::default();
        config.processing.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.trend_epsilon = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.speed.alert = ValueRange::new(1200.0, 1800.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.processing.window_size, created.processing.window_size);
        assert_eq!(loaded.machine.transitions, TransitionTable::default());
        assert_eq!(loaded.analysis.temperature.alert, ValueRange::new(10.0, 40.0));
    }

    #[test]
    fn test_log_dir_resolves_against_data_dir() {
        let mut config = Config::default();
        config.data_dir = PathBuf::from("/var/lib/monitor");
        assert_eq!(config.log_path(), Some(PathBuf::from("/var/lib/monitor/logs")));

        config.log_dir = Some(PathBuf::from("/var/log/monitor"));
        assert_eq!(config.log_path(), Some(PathBuf::from("/var/log/monitor")));

        let config: Config = toml::from_str("log_level = \"debug\"\n").unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("logs")));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("[processing]\nwindow_size = 8\n").unwrap();
        assert_eq!(config.processing.window_size, 8);
        assert_eq!(config.processing.interval_secs, 10);
        assert_eq!(config.machine.initial_status, Status::Shutdown);
    }
}
