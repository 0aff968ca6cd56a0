//! Networking for the debug interface.
//!
//! This module exposes the simulation to host tools over TCP. It provides:
//! 1. **TCP plumbing:** A non-blocking server and connection layer.
//! 2. **Protocol:** Framing, parsing and reply rendering of the text command protocol.
//! 3. **Debug server:** Command dispatch with a single in-flight access gate.

/// Debug command server.
pub mod debug_server;

/// Text command protocol.
pub mod protocol;

/// TCP server and connection layer.
pub mod tcp;

pub use debug_server::DebugServer;
pub use protocol::ProtocolError;
pub use tcp::{IoMode, TcpConnection, TcpServer};
