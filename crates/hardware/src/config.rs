//! Configuration system for the r-VEX platform simulator.
//!
//! This module defines all configuration structures used to parameterize the
//! simulator. It provides:
//! 1. **Defaults:** Baseline platform constants (memory map, timing, debug port).
//! 2. **Structures:** Hierarchical config for simulation, memory, debug and core.
//! 3. **Loading:** JSON parsing and validation through [`Config::from_json`] and
//!    [`Config::from_file`].
//!
//! Every field is optional in JSON; missing sections and fields take their defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::error::SimError;

/// Default configuration constants for the simulator.
///
/// These values define the baseline platform when not explicitly overridden
/// in a JSON configuration file.
mod defaults {
    use crate::common::constants;

    /// Cycles between two `occasional` phases.
    pub const BATCH_CYCLES: u64 = constants::BATCH_CYCLES;

    /// Minimum wall time between performance reports (ms).
    pub const REPORT_INTERVAL_MS: u64 = constants::REPORT_INTERVAL_MS;

    /// Bus address at which the main memory is mapped.
    pub const MEMORY_BASE: u32 = 0;

    /// Log2 of the main memory size (2 GiB).
    ///
    /// Leaves the upper half of the 32-bit address space unmapped so that stray
    /// accesses fault instead of aliasing.
    pub const MEMORY_ADDRESS_BITS: u32 = 31;

    /// Value every memory byte reads as before it is first written.
    pub const MEMORY_INITIAL_VALUE: u8 = 0;

    /// Busy cycles for a non-burst read or the first read of a burst.
    pub const READ_LATENCY: u32 = 0;

    /// Busy cycles for a non-burst write or the first write of a burst.
    pub const WRITE_LATENCY: u32 = 0;

    /// Busy cycles for each subsequent read within a burst.
    pub const READ_PERIOD: u32 = 0;

    /// Busy cycles for each subsequent write within a burst.
    pub const WRITE_PERIOD: u32 = 0;

    /// Log2 of the burst boundary in bytes (1 KiB, as on AHB).
    pub const BURST_BOUNDARY_BITS: u32 = 10;

    /// TCP port of the debug server.
    pub const DEBUG_PORT: u16 = constants::DEFAULT_DEBUG_PORT;

    /// Capacity of the per-connection command buffer.
    pub const MAX_COMMAND_SIZE: usize = constants::MAX_COMMAND_SIZE;

    /// Largest number of bytes per debug access.
    pub const MAX_ACCESS_SIZE: usize = constants::MAX_ACCESS_SIZE;

    /// Bus address of the core's debug register file.
    pub const CORE_DEBUG_BASE: u32 = 0xD000_0000;

    /// Size of the core's debug register window in bytes.
    pub const CORE_DEBUG_SIZE: u32 = 0x400;

    /// Number of lane groups (stall domains) of the core.
    pub const LANE_GROUPS: usize = 4;

    /// Cycles the core is held in reset after initialization.
    pub const RESET_CYCLES: u32 = 10;
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use rvex_sim::config::Config;
///
/// let json = r#"{
///     "memory": { "address_bits": 20, "read_latency": 3 },
///     "debug": { "port": 0 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.memory.address_bits, 20);
/// assert_eq!(config.memory.read_latency, 3);
/// assert_eq!(config.debug.port, 0);
/// assert_eq!(config.simulation.batch_cycles, 1024);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler settings
    pub simulation: SimulationConfig,
    /// Main memory map and timing
    pub memory: MemoryConfig,
    /// Debug server settings
    pub debug: DebugConfig,
    /// Core signal-contract settings
    pub core: CoreConfig,
}

impl Config {
    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Arguments
    ///
    /// * `json` - The JSON document.
    ///
    /// # Returns
    ///
    /// The validated configuration, or [`SimError::ConfigParse`] /
    /// [`SimError::Config`] on failure.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Checks that the configuration describes a platform that can be built.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.simulation.batch_cycles == 0 {
            return Err(SimError::Config("simulation.batch_cycles must be nonzero".into()));
        }
        if self.memory.address_bits > 32 {
            return Err(SimError::Config(format!(
                "memory.address_bits is {}, at most 32 is supported",
                self.memory.address_bits
            )));
        }
        if u64::from(self.memory.base) + self.memory.size() > 1 << 32 {
            return Err(SimError::Config(format!(
                "memory of 2^{} bytes at {:#010x} does not fit in the 32-bit bus",
                self.memory.address_bits, self.memory.base
            )));
        }
        if self.debug.max_access_size == 0 {
            return Err(SimError::Config("debug.max_access_size must be nonzero".into()));
        }
        // Name, address, count and data of the largest Write plus separators.
        let largest_write = "Write".len() + 1 + 8 + 1 + 10 + 1 + 2 * self.debug.max_access_size;
        if self.debug.max_command_size < largest_write {
            return Err(SimError::Config(format!(
                "debug.max_command_size {} cannot hold a {}-byte Write command ({} characters)",
                self.debug.max_command_size, self.debug.max_access_size, largest_write
            )));
        }
        if self.core.lane_groups == 0 {
            return Err(SimError::Config("core.lane_groups must be nonzero".into()));
        }
        Ok(())
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of cycles between two `occasional` phases.
    pub batch_cycles: u64,
    /// Minimum wall time between two performance log lines, in milliseconds.
    pub report_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            batch_cycles: defaults::BATCH_CYCLES,
            report_interval_ms: defaults::REPORT_INTERVAL_MS,
        }
    }
}

/// Main memory configuration.
///
/// Timing values are in bus cycles on top of the cycle the request is accepted in.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Bus address of the first byte.
    #[serde(default = "MemoryConfig::default_base")]
    pub base: u32,
    /// Log2 of the memory size in bytes.
    #[serde(default = "MemoryConfig::default_address_bits")]
    pub address_bits: u32,
    /// Fill value of untouched memory.
    #[serde(default)]
    pub initial_value: u8,
    /// Non-burst read latency.
    #[serde(default = "MemoryConfig::default_read_latency")]
    pub read_latency: u32,
    /// Non-burst write latency.
    #[serde(default = "MemoryConfig::default_write_latency")]
    pub write_latency: u32,
    /// Read period within a burst.
    #[serde(default = "MemoryConfig::default_read_period")]
    pub read_period: u32,
    /// Write period within a burst.
    #[serde(default = "MemoryConfig::default_write_period")]
    pub write_period: u32,
    /// Log2 of the burst boundary; 32 or more disables the boundary.
    #[serde(default = "MemoryConfig::default_burst_boundary_bits")]
    pub burst_boundary_bits: u32,
}

impl MemoryConfig {
    fn default_base() -> u32 {
        defaults::MEMORY_BASE
    }

    fn default_address_bits() -> u32 {
        defaults::MEMORY_ADDRESS_BITS
    }

    fn default_read_latency() -> u32 {
        defaults::READ_LATENCY
    }

    fn default_write_latency() -> u32 {
        defaults::WRITE_LATENCY
    }

    fn default_read_period() -> u32 {
        defaults::READ_PERIOD
    }

    fn default_write_period() -> u32 {
        defaults::WRITE_PERIOD
    }

    fn default_burst_boundary_bits() -> u32 {
        defaults::BURST_BOUNDARY_BITS
    }

    /// Size of the memory in bytes.
    pub const fn size(&self) -> u64 {
        1u64 << self.address_bits
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base: defaults::MEMORY_BASE,
            address_bits: defaults::MEMORY_ADDRESS_BITS,
            initial_value: defaults::MEMORY_INITIAL_VALUE,
            read_latency: defaults::READ_LATENCY,
            write_latency: defaults::WRITE_LATENCY,
            read_period: defaults::READ_PERIOD,
            write_period: defaults::WRITE_PERIOD,
            burst_boundary_bits: defaults::BURST_BOUNDARY_BITS,
        }
    }
}

/// Debug server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// TCP port to listen on; 0 picks an ephemeral port.
    pub port: u16,
    /// Capacity of each connection's command buffer.
    pub max_command_size: usize,
    /// Largest byte count accepted by Read/Write/ROM.
    pub max_access_size: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            port: defaults::DEBUG_PORT,
            max_command_size: defaults::MAX_COMMAND_SIZE,
            max_access_size: defaults::MAX_ACCESS_SIZE,
        }
    }
}

/// Settings of the core adapter ([`crate::soc::core::CoreSystem`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Bus address of the debug register window.
    pub debug_base: u32,
    /// Size of the debug register window in bytes.
    pub debug_size: u32,
    /// Number of lane groups.
    pub lane_groups: usize,
    /// Reset cycles after init.
    pub reset_cycles: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debug_base: defaults::CORE_DEBUG_BASE,
            debug_size: defaults::CORE_DEBUG_SIZE,
            lane_groups: defaults::LANE_GROUPS,
            reset_cycles: defaults::RESET_CYCLES,
        }
    }
}
