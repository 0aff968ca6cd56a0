//! The entity lifecycle.
//!
//! Every simulated component is an [`Entity`]. Over a run the scheduler calls:
//! 1. **`init`** once, before the first cycle.
//! 2. **`clock`** every cycle. Entities only read their inputs and write their
//!    outputs here, so the order in which entities are clocked does not matter.
//! 3. **`synchronize`** every cycle after all entities were clocked, in registration
//!    order. This is where outputs propagate to other entities' inputs and where
//!    outside communication happens.
//! 4. **`occasional`** once per batch of cycles, for slow housekeeping.
//! 5. **`fini`** once, after the last cycle (also when `init` failed somewhere).

use crate::common::error::SimError;

/// Result of a `synchronize` or `occasional` phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Flow {
    /// Keep simulating.
    #[default]
    Continue,
    /// Finish the current phase and shut down.
    Stop,
}

impl Flow {
    /// Whether this result asks for a shutdown.
    pub const fn is_stop(self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// A simulated component.
///
/// Only `name` and `clock` are required; the other phases default to no-ops.
pub trait Entity: Send {
    /// Human-readable instance name, used in log output.
    fn name(&self) -> &str;

    /// Prepares the entity for simulation.
    fn init(&mut self) -> Result<(), SimError> {
        Ok(())
    }

    /// Runs one clock cycle, touching only this entity's own signals.
    fn clock(&mut self);

    /// Propagates outputs after every entity was clocked.
    fn synchronize(&mut self) -> Flow {
        Flow::Continue
    }

    /// Periodic housekeeping, once per batch of cycles.
    fn occasional(&mut self) -> Flow {
        Flow::Continue
    }

    /// Releases resources after the last cycle.
    fn fini(&mut self) {}
}
