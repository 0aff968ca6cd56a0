//! Common utilities and types used throughout the r-VEX platform simulator.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the simulator. It includes:
//! 1. **Constants:** Bus word geometry, protocol limits and simulation intervals.
//! 2. **Error Handling:** The crate-wide `SimError` type for setup and run failures.
//! 3. **Shared State:** The `Shared` handle used for port records that two entities touch.

/// Common constants used throughout the simulator.
pub mod constants;

/// Error types for configuration, socket and lifecycle failures.
pub mod error;

/// Lock-protected shared handles for inter-entity signal records.
pub mod shared;

pub use constants::{BYTES_PER_WORD, FULL_WORD_MASK};
pub use error::SimError;
pub use shared::{Shared, WeakShared};
