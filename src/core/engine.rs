//! Main monitoring engine

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{Coordinator, RuntimeStats, Scheduler};
use crate::analysis::Aggregator;
use crate::api::{self, AppState};
use crate::config::Config;
use crate::machine::MachineState;
use crate::sensors::MachineSimulator;
use crate::store::{FileCheckpoint, JsonlStore, ReadingStore};
use crate::streaming::{CsvSink, FanoutSink, LatestMetrics, LogSink, MetricsSink, MetricsSource};

/// Which parts of the pipeline this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMode {
    pub simulate: bool,
    pub process: bool,
    pub serve_api: bool,
}

impl Default for RunMode {
    fn default() -> Self {
        Self {
            simulate: true,
            process: true,
            serve_api: true,
        }
    }
}

/// Wires the store, state machine, coordinator, simulator and API together
pub struct Engine {
    pub config: Arc<Config>,
    machine: Arc<MachineState>,
    store: Arc<dyn ReadingStore>,
    latest: Arc<LatestMetrics>,
    csv: Arc<CsvSink>,
    coordinator: Arc<Coordinator>,
    stats: Arc<RuntimeStats>,
    scheduler: Scheduler,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating data directory {:?}", config.data_dir))?;

        let store: Arc<dyn ReadingStore> = Arc::new(JsonlStore::open(config.stream_path())?);
        let checkpoints = Arc::new(FileCheckpoint::new(config.checkpoint_path()));
        let csv = Arc::new(CsvSink::new(config.metrics_path())?);

        let restored = csv.last_row().unwrap_or_else(|e| {
            warn!("Could not restore last processed metrics: {}", e);
            None
        });
        let latest = Arc::new(LatestMetrics::seeded(restored));

        let sink = FanoutSink::new()
            .with(csv.clone())
            .with(latest.clone())
            .with(Arc::new(LogSink));

        let initial = match store.last()? {
            Some(reading) => {
                info!("Restoring machine status {} from stream", reading.status);
                reading.status
            }
            None => config.machine.initial_status,
        };
        let machine = Arc::new(
            MachineState::new(config.machine.transitions.clone(), initial).backed_by(store.clone()),
        );

        let stats = Arc::new(RuntimeStats::new());
        let coordinator = Arc::new(Coordinator::new(
            store.clone(),
            checkpoints,
            Arc::new(sink) as Arc<dyn MetricsSink>,
            Aggregator::new(config.analysis.clone()),
            config.processing.window_size,
            stats.clone(),
        )?);

        info!(
            "Engine initialized: stream {:?}, {} readings stored, checkpoint {:?}",
            config.stream_path(),
            store.len()?,
            coordinator.checkpoint().map(|c| c.timestamp)
        );

        Ok(Self {
            config: Arc::new(config),
            machine,
            store,
            latest,
            csv,
            coordinator,
            stats,
            scheduler: Scheduler::new(),
        })
    }

    /// Handles for the API. Without a local coordinator the latest snapshot is
    /// read from the metrics table another process writes.
    pub fn app_state(&self, processing: bool) -> AppState {
        let metrics: Arc<dyn MetricsSource> = if processing {
            self.latest.clone() as Arc<dyn MetricsSource>
        } else {
            self.csv.clone() as Arc<dyn MetricsSource>
        };

        AppState {
            machine: self.machine.clone(),
            store: self.store.clone(),
            metrics,
            stats: self.stats.clone(),
        }
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn stats(&self) -> &Arc<RuntimeStats> {
        &self.stats
    }

    pub async fn start(&mut self, mode: RunMode) -> Result<()> {
        info!("Starting machine monitor engine ({:?})...", mode);

        if mode.simulate {
            let mut simulator = MachineSimulator::new(
                self.machine.clone(),
                self.store.clone(),
                self.config.simulation.seed,
            );
            let stats = self.stats.clone();
            self.scheduler
                .spawn_periodic("simulator", self.config.simulation.interval(), move || {
                    match simulator.step() {
                        Ok(_) => stats.record_generated(),
                        Err(e) => warn!("Simulator step failed: {}", e),
                    }
                });
        }

        if mode.process {
            let coordinator = self.coordinator.clone();
            self.scheduler
                .spawn_periodic("coordinator", self.config.processing.interval(), move || {
                    // Outcome and failures are logged by the coordinator
                    let _ = coordinator.run_cycle();
                });
        }

        if mode.serve_api && self.config.api.enabled {
            let addr: SocketAddr = format!("{}:{}", self.config.api.bind_address, self.config.api.port)
                .parse()
                .context("invalid API bind address")?;
            let state = self.app_state(mode.process);
            self.scheduler.spawn("api", move |shutdown| async move {
                if let Err(e) = api::serve(addr, state, shutdown).await {
                    error!("API server failed: {}", e);
                }
            });
        }

        self.stats.set_running(true);
        info!("Machine monitor engine started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping machine monitor engine...");
        self.scheduler.shutdown().await;
        self.stats.set_running(false);
        info!("Machine monitor engine stopped");
        Ok(())
    }

    pub fn uptime(&self) -> u64 {
        self.stats.uptime_seconds()
    }
}
