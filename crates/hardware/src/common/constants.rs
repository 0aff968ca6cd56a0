//! Global System Constants.
//!
//! This module defines system-wide constants used across the simulator. It includes:
//! 1. **Bus Constants:** Word size and byte-lane masks of the 32-bit platform bus.
//! 2. **Protocol Constants:** Buffer and access limits of the debug command protocol.
//! 3. **Simulation Constants:** Batch sizes and reporting intervals.

/// Number of bytes in one bus data word.
pub const BYTES_PER_WORD: u32 = 4;

/// Write mask that enables all four byte lanes.
pub const FULL_WORD_MASK: u8 = 0xF;

/// Largest number of bytes a single debug Read/Write/ROM command may move.
pub const MAX_ACCESS_SIZE: usize = 4096;

/// Capacity of the per-connection command buffer.
///
/// Sized so that a maximal `Write` command (name, 8 hex address digits, a decimal
/// count and two hex digits per byte) fits with room to spare.
pub const MAX_COMMAND_SIZE: usize = 2 * MAX_ACCESS_SIZE + 256;

/// TCP port the debug server listens on when none is configured.
pub const DEFAULT_DEBUG_PORT: u16 = 21079;

/// Number of cycles between two `occasional` phases.
pub const BATCH_CYCLES: u64 = 1024;

/// Minimum wall time between two performance reports, in milliseconds.
pub const REPORT_INTERVAL_MS: u64 = 1000;

/// Fault code returned for accesses that no slave claims.
pub const UNMAPPED_FAULT_CODE: u32 = 0;
