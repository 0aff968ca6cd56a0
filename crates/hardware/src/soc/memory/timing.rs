//! Memory access timing.
//!
//! This module converts bus transfers into raw memory accesses and busy cycles:
//! 1. **Lane decoding:** A byte-lane mask becomes a byte offset, count and direction.
//! 2. **Burst tracking:** Sequential transfers within a burst boundary are charged the
//!    burst period instead of the full latency.

use crate::config::MemoryConfig;
use crate::soc::interconnect::signals::RequestState;
use crate::soc::memory::virtual_memory::Direction;

/// Raw access described by a byte-lane mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneAccess {
    /// Offset of the first byte within the word.
    pub offset: usize,
    /// Number of bytes.
    pub count: usize,
    /// Transfer direction.
    pub direction: Direction,
}

/// Decodes a byte-lane mask.
///
/// Zero reads the whole word. Contiguous masks write the enabled lanes; bit 3 is
/// byte offset 0. Non-contiguous masks are not supported and return `None`.
pub const fn decode_mask(mask: u8) -> Option<LaneAccess> {
    let (offset, count, direction) = match mask {
        0x0 => (0, 4, Direction::Read),
        0x1 => (3, 1, Direction::Write),
        0x2 => (2, 1, Direction::Write),
        0x3 => (2, 2, Direction::Write),
        0x4 => (1, 1, Direction::Write),
        0x6 => (1, 2, Direction::Write),
        0x7 => (1, 3, Direction::Write),
        0x8 => (0, 1, Direction::Write),
        0xC => (0, 2, Direction::Write),
        0xE => (0, 3, Direction::Write),
        0xF => (0, 4, Direction::Write),
        _ => return None,
    };
    Some(LaneAccess {
        offset,
        count,
        direction,
    })
}

/// Latency parameters of a memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryTiming {
    /// Busy cycles for reads outside a burst.
    pub read_latency: u32,
    /// Busy cycles for writes outside a burst.
    pub write_latency: u32,
    /// Busy cycles for reads continuing a burst.
    pub read_period: u32,
    /// Busy cycles for writes continuing a burst.
    pub write_period: u32,
    /// Address bits that must not change within a burst.
    pub burst_mask: u32,
}

impl MemoryTiming {
    /// Builds the timing from configuration.
    pub const fn from_config(config: &MemoryConfig) -> Self {
        Self {
            read_latency: config.read_latency,
            write_latency: config.write_latency,
            read_period: config.read_period,
            write_period: config.write_period,
            burst_mask: burst_mask(config.burst_boundary_bits),
        }
    }

    /// Busy cycles for an access in `direction`.
    pub const fn busy_cycles(&self, direction: Direction, in_burst: bool) -> u32 {
        match (direction, in_burst) {
            (Direction::Read, true) => self.read_period,
            (Direction::Read, false) => self.read_latency,
            (Direction::Write, true) => self.write_period,
            (Direction::Write, false) => self.write_latency,
        }
    }
}

impl Default for MemoryTiming {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

/// Mask of the address bits above a `2^bits` byte burst boundary.
///
/// 32 or more bits means there is no boundary.
pub const fn burst_mask(bits: u32) -> u32 {
    if bits >= 32 { 0 } else { !((1u32 << bits) - 1) }
}

/// Tracks whether consecutive transfers form a burst.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BurstTracker {
    bursting: bool,
    previous_address: u32,
}

impl BurstTracker {
    /// Accounts for a new transfer.
    ///
    /// # Arguments
    ///
    /// * `state` - Request state of the transfer.
    /// * `address` - Word address of the transfer.
    /// * `burst_mask` - Bits that may not change within one burst.
    ///
    /// # Returns
    ///
    /// `true` if the transfer continues an ongoing burst and is charged the period.
    pub fn advance(&mut self, state: RequestState, address: u32, burst_mask: u32) -> bool {
        let mut start = false;

        if self.bursting && state != RequestState::BurstCont {
            self.bursting = false;
        }
        if self.bursting && address != self.previous_address.wrapping_add(4) {
            self.bursting = false;
            start = true;
        }
        if self.bursting && burst_mask & (address ^ self.previous_address) != 0 {
            self.bursting = false;
            start = true;
        }
        if state == RequestState::BurstStart {
            start = true;
        }

        let continues = self.bursting;
        if start || self.bursting {
            self.bursting = true;
            self.previous_address = address;
        }
        continues
    }

    /// Ends any burst; called when no transfer is presented.
    pub fn reset(&mut self) {
        self.bursting = false;
    }

    /// Whether a burst is in progress.
    pub const fn is_bursting(&self) -> bool {
        self.bursting
    }
}
