//! Services - simulation components and the tick orchestrator
//!
//! This module contains the simulation core:
//! - `simulation` - Owns the world state and runs the fixed-order tick
//! - `regime` - Operating regime state machine and per-regime targets
//! - `telemetry` - Exponential smoothing of vibration and current
//! - `spawner` - Periodic object creation at the belt entry
//! - `registry` - Live object storage keyed by `ObjectId`
//! - `motion` - Belt advance, jam queueing and exit culling
//! - `sensor_gate` - Presence display and one-shot production counting

pub mod motion;
pub mod regime;
pub mod registry;
pub mod sensor_gate;
pub mod simulation;
pub mod spawner;
pub mod telemetry;

// Re-export commonly used types
pub use motion::{MotionEngine, MotionReport};
pub use regime::{RegimeMachine, RegimeOutputs};
pub use registry::ObjectRegistry;
pub use sensor_gate::{GateReading, SensorGate};
pub use simulation::{Simulation, TickEvents};
pub use spawner::SpawnScheduler;
pub use telemetry::TelemetrySignal;
