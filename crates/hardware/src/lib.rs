//! r-VEX platform simulator library.
//!
//! This crate implements a cycle-accurate, bus-level simulator of the r-VEX
//! multi-core VLIW platform with the following:
//! 1. **Simulation:** An entity scheduler with clock, synchronize and occasional phases.
//! 2. **SoC:** A round-robin bus with burst and lock retention, a timed memory backed by
//!    sparse storage, a debug access port, and an adapter for external core models.
//! 3. **Debug interface:** A TCP server speaking the `rvsrv` text protocol
//!    (`Read`, `Write`, `ROM`, `Stop`), so host debug tools can drive the platform.
//! 4. **Configuration:** JSON configuration with defaults for every field.

/// Common types and constants (errors, shared handles, bus geometry).
pub mod common;
/// Simulator configuration (defaults and hierarchical config structures).
pub mod config;
/// Debug TCP server, protocol and socket layer.
pub mod net;
/// Entity lifecycle and the scheduler.
pub mod sim;
/// System-on-chip (builder, bus, memory, debug port, core adapter).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or load it from JSON.
pub use crate::config::Config;
/// Crate-wide error type.
pub use crate::common::error::SimError;
/// Scheduler that owns and drives all entities.
pub use crate::sim::{Entity, Flow, Simulation};
/// Assembled platform and its builder.
pub use crate::soc::{Platform, PlatformBuilder};
