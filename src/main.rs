// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Machine Monitor - simulated machine telemetry with windowed analytics
//!
//! Runs the reading simulator, the periodic processing coordinator and the HTTP
//! API in one process, or any subset of them against a shared data directory.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use machine_monitor::analysis::{Field, StreamReport};
use machine_monitor::store::JsonlStore;
use machine_monitor::{Config, Engine, RunMode, NAME, VERSION};

/// Machine Monitor - simulated machine telemetry with windowed analytics
#[derive(Parser, Debug)]
#[command(name = "machine-monitor")]
#[command(version = VERSION)]
#[command(about = "Simulate a machine sensor stream and process it into health metrics")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory for the stream, checkpoint and metrics files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Only generate readings
    #[arg(long, conflicts_with = "processor_only")]
    simulator_only: bool,

    /// Only process readings written by another simulator
    #[arg(long)]
    processor_only: bool,

    /// Do not start the HTTP API
    #[arg(long)]
    no_api: bool,

    /// HTTP API port
    #[arg(long)]
    port: Option<u16>,

    /// Simulator seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print a whole-stream report and exit
    #[arg(long)]
    report: bool,

    /// Deviation from the mean, in percent, that the report flags as anomalous
    #[arg(long)]
    anomaly_threshold: Option<f64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Console logging plus an optional daily-rolled JSON file. The returned guard
/// flushes the file writer when dropped.
fn init_logging(args: &Args, config: &Config) -> Result<Option<WorkerGuard>> {
    let level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug);
    let console = if args.json_logs || config.json_logs {
        console.json().boxed()
    } else {
        console.with_ansi(true).boxed()
    };

    let (file, guard) = match config.log_path() {
        Some(dir) => {
            std::fs::create_dir_all(&dir).with_context(|| format!("creating log directory {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(&dir, "machine-monitor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(guard)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(threshold) = args.anomaly_threshold {
        config.analysis.anomaly_threshold_pct = threshold;
    }
    config.validate()?;

    let _log_guard = init_logging(&args, &config)?;

    info!("{} v{}", NAME, VERSION);
    info!("Configuration loaded from {:?}", config_path);
    info!("Data directory: {:?}", config.data_dir);

    if args.report {
        return print_report(&config);
    }

    let mode = RunMode {
        simulate: !args.processor_only,
        process: !args.simulator_only,
        serve_api: !args.no_api,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, mode))
}

/// Run the selected pipeline parts until Ctrl+C
async fn run(config: Config, mode: RunMode) -> Result<()> {
    let mut engine = Engine::new(config)?;
    engine.start(mode).await?;

    info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received, cleaning up...");
    engine.stop().await?;

    let stats = engine.stats().snapshot();
    info!(
        "Generated {} readings, processed {} in {} cycles ({} emitted, {} failed), uptime {}s",
        stats.readings_generated,
        stats.readings_processed,
        stats.cycles_run,
        stats.cycles_emitted,
        stats.cycles_failed,
        stats.uptime_seconds
    );
    Ok(())
}

fn print_report(config: &Config) -> Result<()> {
    let store = JsonlStore::open(config.stream_path())?;
    let threshold = config.analysis.anomaly_threshold_pct;

    for field in [Field::Speed, Field::Temperature] {
        let report = StreamReport::from_store(&store, field, threshold)?;
        let limits = match field {
            Field::Speed => &config.analysis.speed,
            Field::Temperature => &config.analysis.temperature,
        };
        println!("{}", report.render(&limits.unit));
    }

    Ok(())
}
