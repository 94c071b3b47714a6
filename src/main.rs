//! Conveyor twin - headless runner for the conveyor digital twin
//!
//! Drives the simulation core either in real time (wall-clock `dt`, Ctrl+C to
//! stop) or as a fixed-step batch (`--ticks N`). Operator commands come from
//! a scripted scenario; snapshots can be appended to a JSONL file.
//!
//! Module structure:
//! - `domain/` - Core types (Regime, MovingObject, Snapshot)
//! - `services/` - Simulation components and the tick orchestrator
//! - `io/` - Edges (snapshot egress, scenarios, keymap)
//! - `infra/` - Infrastructure (Config, Metrics)
//!
//! Usage:
//!   cargo run --bin conveyor-twin -- --config config/dev.toml --scenario demo
//!   cargo run --bin conveyor-twin -- --ticks 3600 --seed 7 --scenario "10:wear,20:jam,30:normal"

use anyhow::Context;
use clap::Parser;
use conveyor_twin::domain::SimulationSnapshot;
use conveyor_twin::infra::{Config, Metrics};
use conveyor_twin::io::{Scenario, SnapshotEgress};
use conveyor_twin::services::Simulation;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Conveyor twin - headless conveyor simulation
#[derive(Parser, Debug)]
#[command(name = "conveyor-twin", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Run N fixed-step ticks as fast as possible instead of in real time
    #[arg(long)]
    ticks: Option<u64>,

    /// Scripted commands: a built-in name ("demo") or "secs:cmd,..." e.g. "10:wear,20:jam,40:quit"
    #[arg(long)]
    scenario: Option<String>,

    /// RNG seed for a reproducible run (overrides [sim].seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Append snapshots to this JSONL file (overrides [egress])
    #[arg(long)]
    egress: Option<String>,
}

/// Everything a single step needs besides the simulation itself
struct Runner {
    sim: Simulation,
    scenario: Option<Scenario>,
    egress: Option<SnapshotEgress>,
    egress_every_ticks: u64,
}

impl Runner {
    /// Deliver due scenario commands, tick once, egress if due
    fn step(&mut self, dt: f64) -> bool {
        if let Some(scenario) = self.scenario.as_mut() {
            for command in scenario.due(self.sim.elapsed_secs()) {
                info!(command = ?command, elapsed_secs = %format!("{:.2}", self.sim.elapsed_secs()), "scenario_command");
                self.sim.apply(command);
            }
        }
        if !self.sim.is_running() {
            return false;
        }

        let snapshot = self.sim.tick(dt);
        if let Some(egress) = self.egress.as_ref() {
            if snapshot.tick % self.egress_every_ticks == 0 {
                egress.write_snapshot(snapshot);
            }
        }
        true
    }
}

fn init_logging() {
    // Default: INFO, use RUST_LOG=debug for per-object spawn/cull events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .init();
    }
}

fn log_final(snapshot: &SimulationSnapshot, metrics: &Metrics) {
    info!(
        ticks = %snapshot.tick,
        elapsed_secs = %format!("{:.2}", snapshot.elapsed_secs),
        regime = %snapshot.regime.as_str(),
        gate = %snapshot.gate.as_str(),
        count = %snapshot.count,
        live_objects = %snapshot.live_objects(),
        "run_finished"
    );
    metrics.report().log();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!(git_hash = env!("GIT_HASH"), "conveyor-twin starting");

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let mut config = Config::load_from_path(&config_path);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(file) = args.egress.as_deref() {
        config = config.with_egress_file(file);
    }

    info!(
        config_file = %config.config_file(),
        tick_hz = %config.tick_hz(),
        seed = ?config.seed(),
        spawn_interval_min_secs = %config.spawn_interval_min_secs(),
        spawn_interval_max_secs = %config.spawn_interval_max_secs(),
        jam_infeed_speed = %config.jam_infeed_speed(),
        egress_enabled = %config.egress_enabled(),
        egress_file = %config.egress_file(),
        "config_loaded"
    );

    let scenario = args
        .scenario
        .as_deref()
        .map(Scenario::parse)
        .transpose()
        .context("Invalid --scenario")?;
    if let Some(scenario) = scenario.as_ref() {
        info!(scenario = %scenario.name(), steps = %scenario.len(), "scenario_loaded");
    }

    let metrics = Arc::new(Metrics::new());
    let egress = config
        .egress_enabled()
        .then(|| SnapshotEgress::new(config.egress_file(), metrics.clone()));

    let mut runner = Runner {
        sim: Simulation::new(&config, metrics.clone()),
        scenario,
        egress,
        egress_every_ticks: config.egress_every_ticks(),
    };

    if let Some(ticks) = args.ticks {
        // Batch: fixed dt, no wall clock
        let dt = config.tick_dt();
        info!(ticks = %ticks, dt = %dt, "batch_started");
        for _ in 0..ticks {
            if !runner.step(dt) {
                break;
            }
        }
        log_final(runner.sim.snapshot(), &metrics);
        return Ok(());
    }

    // Create shutdown signal
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    // Start metrics reporter (lock-free reads)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs_f64(config.tick_dt()));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last = Instant::now();
    info!(tick_hz = %config.tick_hz(), "realtime_started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f64();
                last = now;
                if !runner.step(dt) {
                    break;
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    if runner.scenario.as_ref().is_some_and(|s| !s.is_finished()) {
        warn!("scenario_interrupted");
    }
    log_final(runner.sim.snapshot(), &metrics);
    info!("conveyor-twin shutdown complete");
    Ok(())
}
