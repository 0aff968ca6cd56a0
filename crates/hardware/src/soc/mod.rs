//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components that make up the simulated platform,
//! including the bus, the memory, the debug port, the core adapter and the
//! builder that assembles them.

/// Platform builder for assembling SoC components.
pub mod builder;

/// Core signal contract and bus adapter.
pub mod core;

/// Debug access port and host access records.
pub mod debug;

/// System bus interconnect and routing.
pub mod interconnect;

/// Main memory and its sparse storage.
pub mod memory;

pub use builder::{Platform, PlatformBuilder};
