//! Main system memory.
//!
//! This module implements the memory peripheral. It provides:
//! 1. **Storage:** [`VirtualMemory`], a sparse address space that only allocates
//!    touched regions, so a full 4 GiB memory costs nothing until used.
//! 2. **Timing:** Lane decoding and burst-aware latency modeling.
//! 3. **Memory:** The bus slave entity tying the two together.

/// Lane decoding and burst timing.
pub mod timing;

/// Sparse backing storage.
pub mod virtual_memory;

pub use self::virtual_memory::{Direction, VirtualMemory};

use tracing::debug;

use self::timing::{BurstTracker, MemoryTiming, decode_mask};
use crate::common::shared::Shared;
use crate::config::MemoryConfig;
use crate::sim::entity::Entity;
use crate::soc::interconnect::signals::{ResponseState, SlavePort};

/// Timed memory bus slave.
///
/// A transfer is performed on the cycle the memory first sees it. The response
/// then stays busy for the configured latency (or period, inside a burst) and
/// turns `Ok` when the busy counter reaches zero.
#[derive(Debug)]
pub struct Memory {
    name: String,
    storage: VirtualMemory,
    timing: MemoryTiming,
    burst: BurstTracker,
    busy: u32,
    port: Shared<SlavePort>,
}

impl Memory {
    /// Creates a memory attached to `port`.
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name.
    /// * `config` - Size, fill value and timing.
    /// * `port` - Slave port obtained from [`crate::soc::interconnect::Bus::add_slave`].
    pub fn new(name: impl Into<String>, config: &MemoryConfig, port: Shared<SlavePort>) -> Self {
        Self {
            name: name.into(),
            storage: VirtualMemory::new(config.address_bits, config.initial_value),
            timing: MemoryTiming::from_config(config),
            burst: BurstTracker::default(),
            busy: 0,
            port,
        }
    }

    /// Replaces the timing parameters.
    pub fn set_timing(&mut self, timing: MemoryTiming) {
        self.timing = timing;
    }

    /// Writes `data` at `offset` without going through the bus.
    pub fn load(&mut self, offset: u32, data: &[u8]) {
        self.storage.write(offset, data);
    }

    /// Reads `len` bytes at `offset` without going through the bus.
    pub fn peek(&mut self, offset: u32, len: usize) -> Vec<u8> {
        let mut data = vec![0; len];
        self.storage.read(offset, &mut data);
        data
    }

    /// The backing storage.
    pub const fn storage(&self) -> &VirtualMemory {
        &self.storage
    }
}

impl Entity for Memory {
    fn name(&self) -> &str {
        &self.name
    }

    fn clock(&mut self) {
        let mut port = self.port.lock();
        let Some(request) = port.request else {
            self.burst.reset();
            self.busy = 0;
            return;
        };

        if self.busy == 0 {
            let Some(lanes) = decode_mask(request.mask) else {
                port.response.state = ResponseState::Fault;
                port.response.data = 0;
                return;
            };

            let mut word = request.data.to_be_bytes();
            let bytes = &mut word[lanes.offset..lanes.offset + lanes.count];
            let address = request.address.wrapping_add(lanes.offset as u32);
            self.storage.access(address, bytes, lanes.direction);
            port.response.data = match lanes.direction {
                Direction::Read => u32::from_be_bytes(word),
                Direction::Write => 0,
            };

            let in_burst = self.burst.advance(request.state, request.address, self.timing.burst_mask);
            self.busy = self.timing.busy_cycles(lanes.direction, in_burst);
        } else {
            self.busy -= 1;
        }

        if self.busy == 0 {
            port.response.state = ResponseState::Ok;
        }
    }

    fn fini(&mut self) {
        debug!(
            "{}: {} bytes of storage allocated",
            self.name,
            self.storage.allocated_bytes()
        );
    }
}
