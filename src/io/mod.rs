//! IO modules - everything outside the simulation core
//!
//! This module contains the collaborator-facing edges:
//! - `egress` - Snapshot output to file (JSONL format)
//! - `scenario` - Scripted operator commands for headless runs
//! - `keymap` - Keyboard bindings for the operator dashboard

pub mod egress;
pub mod keymap;
pub mod scenario;

// Re-export commonly used types
pub use egress::SnapshotEgress;
pub use keymap::command_for_key;
pub use scenario::{Scenario, ScenarioStep};
