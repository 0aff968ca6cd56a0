//! # Configuration Tests
//!
//! Tests for configuration defaults, JSON deserialization and validation.

use std::io::Write;

use rvex_sim::SimError;
use rvex_sim::config::*;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.simulation.batch_cycles, 1024);
    assert_eq!(config.simulation.report_interval_ms, 1000);
    assert_eq!(config.debug.port, 21079);
    assert!(config.validate().is_ok());
}

#[test]
fn test_memory_config_defaults() {
    let memory = MemoryConfig::default();
    assert_eq!(memory.base, 0);
    assert_eq!(memory.address_bits, 31);
    assert_eq!(memory.size(), 0x8000_0000);
    assert_eq!(memory.initial_value, 0);
    assert_eq!(memory.read_latency, 0);
    assert_eq!(memory.write_latency, 0);
    assert_eq!(memory.read_period, 0);
    assert_eq!(memory.write_period, 0);
    assert_eq!(memory.burst_boundary_bits, 10);
}

#[test]
fn test_debug_config_defaults() {
    let debug = DebugConfig::default();
    assert_eq!(debug.max_access_size, 4096);
    assert_eq!(debug.max_command_size, 2 * 4096 + 256);
}

#[test]
fn test_core_config_defaults() {
    let core = CoreConfig::default();
    assert_eq!(core.debug_base, 0xD000_0000);
    assert_eq!(core.debug_size, 0x400);
    assert_eq!(core.lane_groups, 4);
    assert_eq!(core.reset_cycles, 10);
}

#[test]
fn test_empty_json_gives_defaults() {
    let config = Config::from_json("{}").unwrap();
    assert_eq!(config.memory.address_bits, 31);
    assert_eq!(config.debug.port, 21079);
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let json = r#"{ "memory": { "read_latency": 7, "base": 268435456 } }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.memory.read_latency, 7);
    assert_eq!(config.memory.base, 0x1000_0000);
    assert_eq!(config.memory.write_latency, 0);
    assert_eq!(config.memory.address_bits, 31);
    assert_eq!(config.memory.burst_boundary_bits, 10);
}

#[test]
fn test_malformed_json_is_parse_error() {
    let result = Config::from_json("{ memory: ");
    assert!(matches!(result, Err(SimError::ConfigParse(_))));
}

#[test]
fn test_wrong_type_is_parse_error() {
    let result = Config::from_json(r#"{ "debug": { "port": "twenty" } }"#);
    assert!(matches!(result, Err(SimError::ConfigParse(_))));
}

#[test]
fn test_validate_rejects_wide_memory() {
    let result = Config::from_json(r#"{ "memory": { "address_bits": 33 } }"#);
    assert!(matches!(result, Err(SimError::Config(_))));
}

#[test]
fn test_validate_rejects_memory_past_top_of_bus() {
    let mut config = Config::default();
    config.memory.base = 0x9000_0000;
    assert!(matches!(config.validate(), Err(SimError::Config(_))));

    config.memory.address_bits = 28;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_accepts_full_address_space() {
    let mut config = Config::default();
    config.memory.address_bits = 32;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_zero_batch() {
    let mut config = Config::default();
    config.simulation.batch_cycles = 0;
    assert!(matches!(config.validate(), Err(SimError::Config(_))));
}

#[test]
fn test_validate_rejects_command_buffer_smaller_than_largest_write() {
    let mut config = Config::default();
    config.debug.max_command_size = 2 * config.debug.max_access_size;
    assert!(matches!(config.validate(), Err(SimError::Config(_))));
}

#[test]
fn test_validate_rejects_zero_lane_groups() {
    let mut config = Config::default();
    config.core.lane_groups = 0;
    assert!(matches!(config.validate(), Err(SimError::Config(_))));
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{ "debug": { "port": 0, "max_access_size": 64 }, "simulation": { "batch_cycles": 16 } }"#)
        .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.debug.port, 0);
    assert_eq!(config.debug.max_access_size, 64);
    assert_eq!(config.simulation.batch_cycles, 16);
}

#[test]
fn test_from_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::from_file(dir.path().join("missing.json"));
    assert!(matches!(result, Err(SimError::Io(_))));
}
