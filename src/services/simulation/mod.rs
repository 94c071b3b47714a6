//! Simulation clock and tick orchestrator
//!
//! The Simulation owns the whole world state and is its only writer. Each
//! call to `tick(dt)` runs the components in a fixed order:
//! 1. regime refresh (apply pending command, publish speed and targets)
//! 2. telemetry filters
//! 3. spawn scheduler
//! 4. motion engine (advance, queue, cull)
//! 5. sensor gate
//! 6. snapshot publish
//!
//! Spawning before motion lets a new object move and be sensed on its first tick.


use crate::domain::snapshot::SimulationSnapshot;
use crate::domain::types::{Command, GateState, ObjectId, Regime};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::motion::MotionEngine;
use crate::services::regime::RegimeMachine;
use crate::services::registry::ObjectRegistry;
use crate::services::sensor_gate::SensorGate;
use crate::services::spawner::SpawnScheduler;
use crate::services::telemetry::{self, TelemetrySignal};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// What happened during the most recent tick
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    pub regime_changed: Option<(Regime, Regime)>,
    pub spawned: Option<ObjectId>,
    pub counted: SmallVec<[ObjectId; 4]>,
    pub culled: SmallVec<[ObjectId; 4]>,
}

impl TickEvents {
    pub fn is_empty(&self) -> bool {
        self.regime_changed.is_none()
            && self.spawned.is_none()
            && self.counted.is_empty()
            && self.culled.is_empty()
    }
}

pub struct Simulation {
    /// Regime state machine (single authoritative regime)
    regime: RegimeMachine,
    /// Smoothed vibration (mm/s)
    vibration: TelemetrySignal,
    /// Smoothed motor current (A)
    current: TelemetrySignal,
    filter_rate: f64,
    spawner: SpawnScheduler,
    registry: ObjectRegistry,
    motion: MotionEngine,
    gate: SensorGate,
    rng: ChaCha8Rng,
    metrics: Arc<Metrics>,
    tick: u64,
    elapsed_secs: f64,
    running: bool,
    snapshot: SimulationSnapshot,
    last_events: TickEvents,
}

impl Simulation {
    pub fn new(config: &Config, metrics: Arc<Metrics>) -> Self {
        let rng = match config.seed() {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        info!(
            seed = ?config.seed(),
            entry_x = %config.entry_x(),
            exit_x = %config.exit_x(),
            gate_enter_x = %config.gate_enter_x(),
            jam_accumulation_x = %config.jam_accumulation_x(),
            "simulation_created"
        );

        Self {
            regime: RegimeMachine::new(config),
            vibration: TelemetrySignal::new("vibration", config.initial_vibration()),
            current: TelemetrySignal::new("current", config.initial_current()),
            filter_rate: config.filter_rate(),
            spawner: SpawnScheduler::new(config),
            registry: ObjectRegistry::new(),
            motion: MotionEngine::new(config),
            gate: SensorGate::new(config),
            rng,
            metrics,
            tick: 0,
            elapsed_secs: 0.0,
            running: true,
            snapshot: SimulationSnapshot::initial(config.initial_vibration(), config.initial_current()),
            last_events: TickEvents::default(),
        }
    }

    /// Deliver an operator command between ticks
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetRegime(regime) => self.regime.request(regime),
            Command::Quit => {
                info!(tick = %self.tick, count = %self.gate.total_count(), "quit_requested");
                self.running = false;
            }
        }
    }

    /// False once a `Quit` command has been applied
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one fixed-order update with the collaborator-supplied `dt`
    pub fn tick(&mut self, dt: f64) -> &SimulationSnapshot {
        let started = Instant::now();
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.tick += 1;
        self.elapsed_secs += dt;
        let mut events = TickEvents::default();

        let (outputs, changed_from) = self.regime.refresh(&mut self.rng);
        if let Some(from) = changed_from {
            self.metrics.record_regime_change(outputs.regime);
            events.regime_changed = Some((from, outputs.regime));
        }

        telemetry::advance(&mut self.vibration, outputs.vibration_target, dt, self.filter_rate);
        telemetry::advance(&mut self.current, outputs.current_target, dt, self.filter_rate);

        events.spawned =
            self.spawner.maybe_spawn(self.elapsed_secs, outputs.regime, &mut self.registry, &mut self.rng);
        if events.spawned.is_some() {
            self.metrics.record_spawn();
        } else if outputs.regime == Regime::Jam {
            self.metrics.record_spawn_suppressed();
        }

        let motion = self.motion.tick(
            &mut self.registry,
            outputs.regime,
            outputs.belt_speed,
            dt,
            &mut self.rng,
        );
        if !motion.culled.is_empty() {
            self.metrics.record_culled(motion.culled.len() as u64);
        }
        events.culled = motion.culled;

        let reading = self.gate.evaluate(&mut self.registry, outputs.belt_speed);
        if !reading.counted.is_empty() {
            self.metrics.record_counted(reading.counted.len() as u64);
        }
        events.counted = reading.counted;

        self.snapshot = SimulationSnapshot {
            tick: self.tick,
            elapsed_secs: self.elapsed_secs,
            regime: outputs.regime,
            status: outputs.regime.status_label(),
            alert: outputs.regime.alert_level(),
            belt_speed: outputs.belt_speed,
            vibration: self.vibration.value,
            current: self.current.value,
            gate: reading.state,
            count: self.gate.total_count(),
            objects: self.registry.snapshot(),
        };
        self.last_events = events;

        let latency_us = started.elapsed().as_micros() as u64;
        self.metrics.record_tick(latency_us, self.registry.len());

        &self.snapshot
    }

    /// Snapshot published by the most recent tick
    #[inline]
    pub fn snapshot(&self) -> &SimulationSnapshot {
        &self.snapshot
    }

    /// Events produced by the most recent tick
    #[inline]
    pub fn last_events(&self) -> &TickEvents {
        &self.last_events
    }

    #[inline]
    pub fn regime(&self) -> Regime {
        self.regime.current()
    }

    #[inline]
    pub fn gate(&self) -> &SensorGate {
        &self.gate
    }

    #[inline]
    pub fn gate_state(&self) -> GateState {
        self.snapshot.gate
    }

    #[inline]
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }
}
