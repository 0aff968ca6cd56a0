//! Debug access port.
//!
//! This module connects host debug tools to the platform bus. It provides:
//! 1. **Access:** The word-level model of one host Read/Write/ROM command.
//! 2. **Port:** The bus master entity that executes accesses on behalf of the
//!    [`crate::net::DebugServer`] it owns.

/// Host access records.
pub mod access;

/// Debug port bus master.
pub mod port;

pub use access::{AccessCommand, AccessKind, AccessOutcome, PendingAccess};
pub use port::DebugPort;
