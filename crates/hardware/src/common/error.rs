//! Simulator error definitions.
//!
//! This module defines the error handling for fallible setup and run paths. It provides:
//! 1. **Socket Errors:** Failures to open the debug server's listening socket.
//! 2. **Configuration Errors:** Parse and validation failures of the platform config.
//! 3. **Lifecycle Errors:** Entities that failed to initialise before the run loop.
//!
//! Protocol-level problems are not errors in this sense; they are answered on the wire
//! (see [`crate::net::protocol::ProtocolError`]).

use std::io;

use thiserror::Error;

/// Errors produced while building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// The listening socket of a server entity could not be opened.
    #[error("{name}: failed to open TCP server on port {port}")]
    Bind {
        /// Name of the entity that owns the server.
        name: String,
        /// Requested port.
        port: u16,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Generic I/O failure, e.g. while reading a config file or memory image.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configuration is structurally valid but describes an impossible platform.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// One or more entities failed to initialise; the loop was not started.
    #[error("initialization failed for: {}", .0.join(", "))]
    InitFailed(Vec<String>),
}
