//! # Platform Integration Tests
//!
//! These tests build a complete platform, run it in a background thread and talk
//! to it over the debug socket the way a host debugger would.

/// Debug sessions against a running platform.
pub mod debug_session;
