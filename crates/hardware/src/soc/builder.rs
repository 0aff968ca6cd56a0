//! Platform construction.
//!
//! This module builds the complete simulated platform from configuration. It performs:
//! 1. **Bus setup:** Creates the bus and registers the debug port (and core) as masters.
//! 2. **Slave registration:** Maps the core's debug registers and the main memory.
//! 3. **Image loading:** Preloads memory images through the memory backdoor.
//! 4. **Debug server:** Opens the debug TCP port so its address is known before the run.
//!
//! Entities are registered in the order debug port, core, memory, bus, which is the
//! order their `synchronize` phases run in.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use tracing::info;

use crate::common::error::SimError;
use crate::common::shared::Shared;
use crate::config::Config;
use crate::sim::entity::Entity;
use crate::sim::simulation::{Simulation, StopHandle};
use crate::soc::core::{CoreModel, CoreSystem};
use crate::soc::debug::DebugPort;
use crate::soc::interconnect::Bus;
use crate::soc::interconnect::demux;
use crate::soc::interconnect::signals::{MasterHandle, SlavePort};
use crate::soc::memory::Memory;
use crate::stats::SimStats;

type CoreFactory = Box<dyn FnOnce(&Config, Shared<SlavePort>, MasterHandle) -> Box<dyn Entity>>;

/// A built platform, ready to run.
#[derive(Debug)]
pub struct Platform {
    simulation: Simulation,
    debug_addr: SocketAddr,
}

impl Platform {
    /// Address the debug server listens on.
    pub const fn debug_addr(&self) -> SocketAddr {
        self.debug_addr
    }

    /// Handle to stop the run from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.simulation.stop_handle()
    }

    /// The underlying scheduler.
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Runs until a debug client sends `Stop` or another entity ends the run.
    pub fn run(&mut self) -> Result<SimStats, SimError> {
        self.simulation.run()
    }

    /// Runs at most `max_cycles` cycles.
    pub fn run_cycles(&mut self, max_cycles: u64) -> Result<SimStats, SimError> {
        self.simulation.run_cycles(max_cycles)
    }
}

/// Fluent builder for [`Platform`].
pub struct PlatformBuilder {
    config: Config,
    images: Vec<(u32, Vec<u8>)>,
    core: Option<CoreFactory>,
}

impl std::fmt::Debug for PlatformBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformBuilder")
            .field("config", &self.config)
            .field("images", &self.images.len())
            .field("core", &self.core.is_some())
            .finish()
    }
}

impl PlatformBuilder {
    /// Starts a builder for `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            images: Vec::new(),
            core: None,
        }
    }

    /// Attaches a core model.
    pub fn with_core<M: CoreModel + 'static>(mut self, model: M) -> Self {
        self.core = Some(Box::new(move |config: &Config, debug_slave: Shared<SlavePort>, memory: MasterHandle| {
            Box::new(CoreSystem::new("core", model, &config.core, debug_slave, memory)) as Box<dyn Entity>
        }));
        self
    }

    /// Preloads `data` at bus address `address`.
    pub fn load_image(mut self, address: u32, data: Vec<u8>) -> Self {
        self.images.push((address, data));
        self
    }

    /// Preloads the contents of the file at `path` at bus address `address`.
    pub fn load_file(self, address: u32, path: impl AsRef<Path>) -> Result<Self, SimError> {
        let data = fs::read(path)?;
        Ok(self.load_image(address, data))
    }

    /// Builds the platform and opens the debug server.
    pub fn build(self) -> Result<Platform, SimError> {
        let config = self.config;
        config.validate()?;

        let mut bus = Bus::new("bus");
        let debug_master = bus.add_master();

        let core = self.core.map(|factory| {
            let memory_master = bus.add_master();
            let debug_slave = bus.add_slave(demux::range(config.core.debug_base, u64::from(config.core.debug_size)));
            factory(&config, debug_slave, memory_master)
        });

        let memory_port = bus.add_slave(demux::range(config.memory.base, config.memory.size()));
        let mut memory = Memory::new("memory", &config.memory, memory_port);
        for (address, data) in &self.images {
            let offset = address.wrapping_sub(config.memory.base);
            if u64::from(offset) + data.len() as u64 > config.memory.size() {
                return Err(SimError::Config(format!(
                    "image of {} bytes at {address:#010x} does not fit in memory",
                    data.len()
                )));
            }
            memory.load(offset, data);
            info!("loaded {} bytes at {address:#010x}", data.len());
        }

        let mut debug_port = DebugPort::new("debug", &config.debug, debug_master);
        let debug_addr = debug_port.bind()?;

        let mut simulation = Simulation::new(&config.simulation);
        simulation.add(debug_port);
        if let Some(core) = core {
            simulation.add_boxed(core);
        }
        simulation.add(memory);
        simulation.add(bus);

        Ok(Platform {
            simulation,
            debug_addr,
        })
    }
}
