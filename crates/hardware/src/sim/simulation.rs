//! Top-level scheduler.
//!
//! The `Simulation` owns every entity and advances simulated time in batches:
//! each cycle clocks all entities and then synchronizes them in registration order,
//! and after each full batch every entity gets an `occasional` call. A stop
//! requested in `synchronize` takes effect once the current cycle's synchronize
//! phase has completed; `fini` always runs before `run` returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::common::error::SimError;
use crate::config::SimulationConfig;
use crate::sim::entity::{Entity, Flow};
use crate::stats::{SimStats, format_frequency};

/// Handle that asks a running simulation to stop at the next batch boundary.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests the stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The scheduler.
pub struct Simulation {
    entities: Vec<Box<dyn Entity>>,
    batch_cycles: u64,
    report_interval: Duration,
    stop: StopHandle,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("entities", &self.entity_names())
            .field("batch_cycles", &self.batch_cycles)
            .finish_non_exhaustive()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(&SimulationConfig::default())
    }
}

impl Simulation {
    /// Creates an empty simulation.
    ///
    /// # Arguments
    ///
    /// * `config` - Batch size and report interval.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            entities: Vec::new(),
            batch_cycles: config.batch_cycles.max(1),
            report_interval: Duration::from_millis(config.report_interval_ms),
            stop: StopHandle::default(),
        }
    }

    /// Appends an entity. Registration order is the synchronize order.
    pub fn add(&mut self, entity: impl Entity + 'static) {
        self.entities.push(Box::new(entity));
    }

    /// Appends an already boxed entity.
    pub fn add_boxed(&mut self, entity: Box<dyn Entity>) {
        self.entities.push(entity);
    }

    /// Names of the registered entities, in order.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name()).collect()
    }

    /// Returns a handle that stops the run from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs until an entity requests a stop.
    ///
    /// # Returns
    ///
    /// Run statistics, or [`SimError::InitFailed`] if any entity failed to
    /// initialize (in which case no cycle was simulated).
    pub fn run(&mut self) -> Result<SimStats, SimError> {
        self.execute(None)
    }

    /// Runs at most `max_cycles` cycles, stopping earlier if an entity asks to.
    pub fn run_cycles(&mut self, max_cycles: u64) -> Result<SimStats, SimError> {
        self.execute(Some(max_cycles))
    }

    fn execute(&mut self, limit: Option<u64>) -> Result<SimStats, SimError> {
        info!("simulation entities: {}", self.entity_names().join(", "));

        let mut failed = Vec::new();
        for entity in &mut self.entities {
            if let Err(err) = entity.init() {
                error!("{}: initialization failed: {err}", entity.name());
                failed.push(entity.name().to_owned());
            }
        }
        if !failed.is_empty() {
            self.fini_all();
            return Err(SimError::InitFailed(failed));
        }

        let mut stats = SimStats::new();
        let mut last_report = Instant::now();
        let mut last_report_cycles = 0;

        'run: loop {
            let batch = limit.map_or(self.batch_cycles, |limit| {
                (limit - stats.cycles).min(self.batch_cycles)
            });
            if batch == 0 {
                break;
            }

            for _ in 0..batch {
                for entity in &mut self.entities {
                    entity.clock();
                }
                let stopped_by = Self::phase(&mut self.entities, |e| e.synchronize());
                stats.cycles += 1;
                if stopped_by.is_some() {
                    stats.stopped_by = stopped_by;
                    break 'run;
                }
            }

            if batch < self.batch_cycles {
                continue;
            }
            stats.batches += 1;
            let stopped_by = Self::phase(&mut self.entities, |e| e.occasional());
            if stopped_by.is_some() {
                stats.stopped_by = stopped_by;
                break;
            }
            if self.stop.is_stopped() {
                info!("simulation stopped by request");
                break;
            }

            let elapsed = last_report.elapsed();
            if elapsed >= self.report_interval {
                let cycles = stats.cycles - last_report_cycles;
                info!(
                    "simulation running at {}, at {} cycles",
                    format_frequency(cycles as f64 / elapsed.as_secs_f64()),
                    stats.cycles
                );
                last_report = Instant::now();
                last_report_cycles = stats.cycles;
            }
        }

        self.fini_all();
        stats.finish();
        Ok(stats)
    }

    /// Runs a phase on every entity in order and returns the first entity that
    /// asked to stop.
    fn phase(
        entities: &mut [Box<dyn Entity>],
        mut run: impl FnMut(&mut dyn Entity) -> Flow,
    ) -> Option<String> {
        let mut stopped_by = None;
        for entity in entities {
            if run(entity.as_mut()).is_stop() && stopped_by.is_none() {
                stopped_by = Some(entity.name().to_owned());
            }
        }
        stopped_by
    }

    fn fini_all(&mut self) {
        for entity in &mut self.entities {
            entity.fini();
        }
    }
}
