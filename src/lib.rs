//! Conveyor digital twin library
//!
//! Exposes the simulation core for the binaries and integration tests.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
