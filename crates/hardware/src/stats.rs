//! Simulation statistics collection and reporting.
//!
//! This module tracks run-level metrics of a simulation. It provides:
//! 1. **Cycles:** Total simulated cycles and completed batches.
//! 2. **Speed:** Wall time and the resulting simulated clock frequency.
//! 3. **Shutdown:** Which entity ended the run.

use std::time::{Duration, Instant};

/// Statistics of one [`crate::sim::Simulation`] run.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    /// Total simulated cycles.
    pub cycles: u64,
    /// Number of full batches (and therefore `occasional` phases) completed.
    pub batches: u64,
    /// Wall time of the run, set when the run finishes.
    pub elapsed: Duration,
    /// Name of the entity that requested the stop, if any.
    pub stopped_by: Option<String>,
}

impl Default for SimStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SimStats {
    /// Starts a new set of statistics at the current instant.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            batches: 0,
            elapsed: Duration::ZERO,
            stopped_by: None,
        }
    }

    /// Freezes the wall time.
    pub fn finish(&mut self) {
        self.elapsed = self.start_time.elapsed();
    }

    /// Average simulated clock frequency in Hz over the run.
    pub fn frequency(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.cycles as f64 / seconds
        } else {
            0.0
        }
    }

    /// Prints a summary to stdout.
    pub fn print(&self) {
        println!("==========================================================");
        println!("Simulation summary");
        println!("  Cycles:      {}", self.cycles);
        println!("  Batches:     {}", self.batches);
        println!("  Wall time:   {:.3} s", self.elapsed.as_secs_f64());
        println!("  Speed:       {}", format_frequency(self.frequency()));
        if let Some(name) = &self.stopped_by {
            println!("  Stopped by:  {name}");
        }
        println!("==========================================================");
    }
}

/// Formats a frequency with an Hz, kHz or MHz unit.
///
/// ```
/// use rvex_sim::stats::format_frequency;
///
/// assert_eq!(format_frequency(512.0), "  512.00 Hz");
/// assert_eq!(format_frequency(2_500_000.0), "    2.50 MHz");
/// ```
pub fn format_frequency(hz: f64) -> String {
    let (value, unit) = if hz >= 1e6 {
        (hz / 1e6, "MHz")
    } else if hz >= 1e3 {
        (hz / 1e3, "kHz")
    } else {
        (hz, "Hz")
    };
    format!("{value:8.2} {unit}")
}
