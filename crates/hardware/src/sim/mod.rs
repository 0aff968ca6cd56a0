//! Simulation scheduling.
//!
//! This module drives simulated time. It provides:
//! 1. **Entity:** The lifecycle contract every simulated component implements.
//! 2. **Simulation:** The scheduler that owns the entities and runs the
//!    clock/synchronize/occasional phases until an entity requests a stop.

/// Entity lifecycle trait and phase results.
pub mod entity;

/// Top-level scheduler.
pub mod simulation;

pub use entity::{Entity, Flow};
pub use simulation::Simulation;
