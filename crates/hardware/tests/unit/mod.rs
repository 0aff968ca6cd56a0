//! # Unit Components
//!
//! This module is the hub of the component tests. Each submodule exercises one
//! building block of the simulator in isolation, stepping entities by hand where
//! timing matters.

/// Configuration defaults, parsing and validation.
pub mod config;


/// Run statistics and frequency formatting.
pub mod stats;
