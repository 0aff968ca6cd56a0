//! Simulation statistics tests.

use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvex_sim::stats::{SimStats, format_frequency};

#[rstest]
#[case(0.0, "    0.00 Hz")]
#[case(999.0, "  999.00 Hz")]
#[case(1_000.0, "    1.00 kHz")]
#[case(48_250.0, "   48.25 kHz")]
#[case(12_345_678.0, "   12.35 MHz")]
fn frequency_formatting(#[case] hz: f64, #[case] expected: &str) {
    assert_eq!(format_frequency(hz), expected);
}

#[test]
fn new_stats_are_zero() {
    let stats = SimStats::new();
    assert_eq!(stats.cycles, 0);
    assert_eq!(stats.batches, 0);
    assert_eq!(stats.elapsed, Duration::ZERO);
    assert!(stats.stopped_by.is_none());
}

#[test]
fn frequency_is_zero_without_elapsed_time() {
    let mut stats = SimStats::new();
    stats.cycles = 1000;
    assert_eq!(stats.frequency(), 0.0);
}

#[test]
fn frequency_divides_cycles_by_wall_time() {
    let mut stats = SimStats::new();
    stats.cycles = 5000;
    stats.elapsed = Duration::from_millis(500);
    assert!((stats.frequency() - 10_000.0).abs() < 1e-6);
}

#[test]
fn finish_records_wall_time() {
    let mut stats = SimStats::new();
    std::thread::sleep(Duration::from_millis(2));
    stats.finish();
    assert!(stats.elapsed >= Duration::from_millis(2));
}
