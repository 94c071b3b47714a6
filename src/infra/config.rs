//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every key has a default, so a partial file only overrides what it names.

use crate::domain::types::Regime;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub entry_x: f64,
    pub exit_x: f64,
    /// Max lateral offset drawn at spawn (either side of the belt centre)
    pub lateral_jitter: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self { entry_x: -5.0, exit_x: 25.0, lateral_jitter: 0.5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enter_x: f64,
    /// Width of the detection zone; the clear zone has the same width
    pub zone_width: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { enter_x: 14.9, zone_width: 0.2 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JamConfig {
    pub accumulation_x: f64,
    pub blocking_distance: f64,
    /// Speed at which upstream accumulation pushes objects while the belt is stopped
    pub infeed_speed: f64,
    pub stall_jitter: f64,
}

impl Default for JamConfig {
    fn default() -> Self {
        Self { accumulation_x: 12.0, blocking_distance: 0.9, infeed_speed: 1.5, stall_jitter: 0.01 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub interval_min_secs: f64,
    pub interval_max_secs: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self { interval_min_secs: 1.2, interval_max_secs: 1.8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub filter_rate: f64,
    pub initial_vibration: f64,
    pub initial_current: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { filter_rate: 5.0, initial_vibration: 0.5, initial_current: 2.0 }
    }
}

/// Belt speed and telemetry targets published while a regime is active
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RegimeProfile {
    pub speed: f64,
    pub vibration: f64,
    #[serde(default)]
    pub vibration_jitter: f64,
    pub current: f64,
    #[serde(default)]
    pub current_jitter: f64,
}

impl RegimeProfile {
    fn normal() -> Self {
        Self { speed: 6.0, vibration: 0.5, vibration_jitter: 0.1, current: 2.0, current_jitter: 0.1 }
    }

    fn wear() -> Self {
        Self { speed: 5.5, vibration: 4.5, vibration_jitter: 0.5, current: 2.5, current_jitter: 0.1 }
    }

    fn jam() -> Self {
        Self { speed: 0.0, vibration: 0.1, vibration_jitter: 0.0, current: 8.0, current_jitter: 0.5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegimesConfig {
    pub normal: RegimeProfile,
    pub wear: RegimeProfile,
    pub jam: RegimeProfile,
}

impl Default for RegimesConfig {
    fn default() -> Self {
        Self { normal: RegimeProfile::normal(), wear: RegimeProfile::wear(), jam: RegimeProfile::jam() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_hz: u32,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { tick_hz: 60, seed: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EgressConfig {
    pub enabled: bool,
    /// File path for snapshot egress (JSONL format)
    pub file: String,
    /// Write one snapshot every N ticks
    pub every_ticks: u64,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { enabled: false, file: default_egress_file(), every_ticks: 6 }
    }
}

fn default_egress_file() -> String {
    "snapshots.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TomlConfig {
    pub track: TrackConfig,
    pub gate: GateConfig,
    pub jam: JamConfig,
    pub spawn: SpawnConfig,
    pub telemetry: TelemetryConfig,
    pub regimes: RegimesConfig,
    pub sim: SimConfig,
    pub metrics: MetricsConfig,
    pub egress: EgressConfig,
}

/// Main configuration struct used throughout the application
///
/// Fixed after load; only the regime changes at runtime.
#[derive(Debug, Clone)]
pub struct Config {
    entry_x: f64,
    exit_x: f64,
    lateral_jitter: f64,
    gate_enter_x: f64,
    gate_zone_width: f64,
    jam_accumulation_x: f64,
    blocking_distance: f64,
    jam_infeed_speed: f64,
    stall_jitter: f64,
    spawn_interval_min_secs: f64,
    spawn_interval_max_secs: f64,
    filter_rate: f64,
    initial_vibration: f64,
    initial_current: f64,
    regimes: RegimesConfig,
    tick_hz: u32,
    seed: Option<u64>,
    metrics_interval_secs: u64,
    egress_enabled: bool,
    egress_file: String,
    egress_every_ticks: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

/// Clamp to a finite, non-negative value
#[inline]
fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

/// Clamp profile values and enforce a stopped belt in JAM
///
/// NORMAL must run faster than WEAR; a file that breaks this is kept as
/// written but warned about.
fn sanitise_regimes(mut regimes: RegimesConfig) -> RegimesConfig {
    for profile in [&mut regimes.normal, &mut regimes.wear, &mut regimes.jam] {
        profile.speed = non_negative(profile.speed);
        profile.vibration_jitter = non_negative(profile.vibration_jitter);
        profile.current_jitter = non_negative(profile.current_jitter);
    }

    if regimes.jam.speed != 0.0 {
        warn!(configured = %regimes.jam.speed, "jam_speed_forced_to_zero");
        regimes.jam.speed = 0.0;
    }

    if regimes.normal.speed <= regimes.wear.speed {
        warn!(
            normal = %regimes.normal.speed,
            wear = %regimes.wear.speed,
            "regime_speeds_not_ordered"
        );
    }

    regimes
}

impl Config {
    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content).context("Failed to parse config")?;
        Ok(Self::from_toml(toml_config, "inline"))
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults on any error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    fn from_toml(toml_config: TomlConfig, source: &str) -> Self {
        let TomlConfig { track, gate, jam, spawn, telemetry, regimes, sim, metrics, egress } =
            toml_config;

        let mut interval_min = non_negative(spawn.interval_min_secs);
        let mut interval_max = non_negative(spawn.interval_max_secs);
        if interval_min > interval_max {
            std::mem::swap(&mut interval_min, &mut interval_max);
        }

        Self {
            entry_x: track.entry_x,
            exit_x: track.exit_x,
            lateral_jitter: non_negative(track.lateral_jitter),
            gate_enter_x: gate.enter_x,
            gate_zone_width: non_negative(gate.zone_width),
            jam_accumulation_x: jam.accumulation_x,
            blocking_distance: non_negative(jam.blocking_distance),
            jam_infeed_speed: non_negative(jam.infeed_speed),
            stall_jitter: non_negative(jam.stall_jitter),
            spawn_interval_min_secs: interval_min,
            spawn_interval_max_secs: interval_max,
            filter_rate: non_negative(telemetry.filter_rate),
            initial_vibration: telemetry.initial_vibration,
            initial_current: telemetry.initial_current,
            regimes: sanitise_regimes(regimes),
            tick_hz: sim.tick_hz.max(1),
            seed: sim.seed,
            metrics_interval_secs: metrics.interval_secs.max(1),
            egress_enabled: egress.enabled,
            egress_file: egress.file,
            egress_every_ticks: egress.every_ticks.max(1),
            config_file: source.to_string(),
        }
    }

    /// Profile published while `regime` is active
    pub fn regime_profile(&self, regime: Regime) -> &RegimeProfile {
        match regime {
            Regime::Normal => &self.regimes.normal,
            Regime::Wear => &self.regimes.wear,
            Regime::Jam => &self.regimes.jam,
        }
    }

    // Getters for all config fields
    pub fn entry_x(&self) -> f64 {
        self.entry_x
    }

    pub fn exit_x(&self) -> f64 {
        self.exit_x
    }

    pub fn lateral_jitter(&self) -> f64 {
        self.lateral_jitter
    }

    pub fn gate_enter_x(&self) -> f64 {
        self.gate_enter_x
    }

    pub fn gate_zone_width(&self) -> f64 {
        self.gate_zone_width
    }

    pub fn jam_accumulation_x(&self) -> f64 {
        self.jam_accumulation_x
    }

    pub fn blocking_distance(&self) -> f64 {
        self.blocking_distance
    }

    pub fn jam_infeed_speed(&self) -> f64 {
        self.jam_infeed_speed
    }

    pub fn stall_jitter(&self) -> f64 {
        self.stall_jitter
    }

    pub fn spawn_interval_min_secs(&self) -> f64 {
        self.spawn_interval_min_secs
    }

    pub fn spawn_interval_max_secs(&self) -> f64 {
        self.spawn_interval_max_secs
    }

    pub fn filter_rate(&self) -> f64 {
        self.filter_rate
    }

    pub fn initial_vibration(&self) -> f64 {
        self.initial_vibration
    }

    pub fn initial_current(&self) -> f64 {
        self.initial_current
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    /// Fixed step used in batch mode
    pub fn tick_dt(&self) -> f64 {
        1.0 / f64::from(self.tick_hz)
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn egress_enabled(&self) -> bool {
        self.egress_enabled
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn egress_every_ticks(&self) -> u64 {
        self.egress_every_ticks
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder for a reproducible RNG seed (CLI override and tests)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder for the spawn interval range; bounds are sanitised like the TOML path
    pub fn with_spawn_interval(mut self, min_secs: f64, max_secs: f64) -> Self {
        let (min_secs, max_secs) = (non_negative(min_secs), non_negative(max_secs));
        self.spawn_interval_min_secs = min_secs.min(max_secs);
        self.spawn_interval_max_secs = min_secs.max(max_secs);
        self
    }

    /// Builder enabling snapshot egress to `file`
    pub fn with_egress_file(mut self, file: &str) -> Self {
        self.egress_enabled = true;
        self.egress_file = file.to_string();
        self
    }

    /// Builder for the jam infeed speed
    pub fn with_jam_infeed_speed(mut self, speed: f64) -> Self {
        self.jam_infeed_speed = non_negative(speed);
        self
    }
}
