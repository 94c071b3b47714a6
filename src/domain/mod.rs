//! Domain models - core simulation types
//!
//! This module contains the plain data types shared by every component:
//! - `MovingObject` - one bottle on the belt
//! - `Regime` - operating regime (NORMAL, WEAR, JAM)
//! - `Command` - discrete operator commands
//! - `SimulationSnapshot` - the per-tick read-only view for presentation

pub mod object;
pub mod snapshot;
pub mod types;

// Re-export commonly used types at module level
pub use object::MovingObject;
pub use snapshot::{ObjectView, SimulationSnapshot};
pub use types::{AlertLevel, Command, GateState, ObjectId, Regime};
