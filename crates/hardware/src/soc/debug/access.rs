//! The in-flight debug access.
//!
//! A host command moves an arbitrary byte range, but the bus moves aligned words.
//! `PendingAccess` holds the word-level view of one command: the words it covers,
//! the byte-lane masks of the first and last word, and a word buffer that holds
//! write data on the way in and read data on the way out.
//!
//! Words are big-endian: the byte at address `A` lives in bits
//! `8 * (3 - A % 4)` of its word.

use std::fmt;

use crate::common::constants::{BYTES_PER_WORD, FULL_WORD_MASK};
use crate::soc::memory::Direction;

/// The host command an access was created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessCommand {
    /// Bus read.
    Read,
    /// Bus write.
    Write,
    /// Read from the debug ROM.
    Rom,
}

impl AccessCommand {
    /// Name of the command on the wire.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Rom => "ROM",
        }
    }

    /// Looks up a command by its wire name.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "Read" => Some(Self::Read),
            "Write" => Some(Self::Write),
            "ROM" => Some(Self::Rom),
            _ => None,
        }
    }

    /// Which address space the command targets.
    pub const fn kind(self) -> AccessKind {
        match self {
            Self::Read | Self::Write => AccessKind::Bus,
            Self::Rom => AccessKind::Rom,
        }
    }

    /// Transfer direction of the command.
    pub const fn direction(self) -> Direction {
        match self {
            Self::Write => Direction::Write,
            Self::Read | Self::Rom => Direction::Read,
        }
    }
}

impl fmt::Display for AccessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Address space of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// The platform bus.
    Bus,
    /// The debug ROM.
    Rom,
}

/// Result of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
    /// Not completed yet.
    Pending,
    /// All words transferred.
    Ok,
    /// The bus faulted with the given code.
    Fault(u32),
    /// The simulator could not perform the access at all.
    Error,
}

/// One host access, split into bus words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAccess {
    command: AccessCommand,
    address: u32,
    count: usize,
    words: Vec<u32>,
    first_mask: u8,
    last_mask: u8,
    outcome: AccessOutcome,
}

impl PendingAccess {
    /// Creates a read (or ROM read) of `count` bytes at `address`.
    pub fn read(command: AccessCommand, address: u32, count: usize) -> Self {
        Self::new(command, address, count)
    }

    /// Creates a write of `data` at `address`.
    pub fn write(address: u32, data: &[u8]) -> Self {
        let mut access = Self::new(AccessCommand::Write, address, data.len());
        let lead = access.lead();
        for (i, byte) in data.iter().enumerate() {
            let lane = lead + i;
            access.words[lane / 4] |= u32::from(*byte) << lane_shift(lane);
        }
        access
    }

    fn new(command: AccessCommand, address: u32, count: usize) -> Self {
        let lead = (address % BYTES_PER_WORD) as usize;
        let num_words = if count == 0 { 0 } else { (lead + count).div_ceil(4) };

        let first = FULL_WORD_MASK >> lead;
        let end = (lead + count) % 4;
        let last = if end == 0 {
            FULL_WORD_MASK
        } else {
            (FULL_WORD_MASK << (4 - end)) & FULL_WORD_MASK
        };
        let (first_mask, last_mask) = if num_words == 1 {
            (first & last, first & last)
        } else {
            (first, last)
        };

        Self {
            command,
            address,
            count,
            words: vec![0; num_words],
            first_mask,
            last_mask,
            outcome: AccessOutcome::Pending,
        }
    }

    /// Byte offset of the access within its first word.
    const fn lead(&self) -> usize {
        (self.address % BYTES_PER_WORD) as usize
    }

    /// The command this access belongs to.
    pub const fn command(&self) -> AccessCommand {
        self.command
    }

    /// Address space of the access.
    pub const fn kind(&self) -> AccessKind {
        self.command.kind()
    }

    /// Transfer direction.
    pub const fn direction(&self) -> Direction {
        self.command.direction()
    }

    /// First byte address as issued by the host.
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Number of bytes.
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Number of bus words covered.
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Byte-lane mask of the first word.
    pub const fn first_mask(&self) -> u8 {
        self.first_mask
    }

    /// Byte-lane mask of the last word.
    pub const fn last_mask(&self) -> u8 {
        self.last_mask
    }

    /// Bus address of word `index`. Wraps at the top of the address space.
    pub const fn word_address(&self, index: usize) -> u32 {
        (self.address & !(BYTES_PER_WORD - 1)).wrapping_add(index as u32 * BYTES_PER_WORD)
    }

    /// Write mask of word `index`.
    pub fn word_mask(&self, index: usize) -> u8 {
        if index == 0 {
            self.first_mask
        } else if index + 1 == self.num_words() {
            self.last_mask
        } else {
            FULL_WORD_MASK
        }
    }

    /// Word `index` of the buffer.
    pub fn word(&self, index: usize) -> u32 {
        self.words[index]
    }

    /// Stores read data for word `index`.
    pub fn set_word(&mut self, index: usize, value: u32) {
        self.words[index] = value;
    }

    /// The bytes of the access, extracted from the word buffer.
    pub fn data(&self) -> Vec<u8> {
        let lead = self.lead();
        (0..self.count)
            .map(|i| {
                let lane = lead + i;
                (self.words[lane / 4] >> lane_shift(lane)) as u8
            })
            .collect()
    }

    /// Outcome so far.
    pub const fn outcome(&self) -> AccessOutcome {
        self.outcome
    }

    /// Records the final outcome.
    pub fn complete(&mut self, outcome: AccessOutcome) {
        self.outcome = outcome;
    }

    /// Whether an outcome other than `Pending` was recorded.
    pub fn is_complete(&self) -> bool {
        self.outcome != AccessOutcome::Pending
    }
}

/// Bit position of byte lane `lane` (counted from the first word's byte 0).
const fn lane_shift(lane: usize) -> u32 {
    8 * (3 - (lane % 4) as u32)
}
