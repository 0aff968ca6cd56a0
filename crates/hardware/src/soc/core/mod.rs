//! Processor core adapter.
//!
//! The core pipeline itself lives outside this crate; it is plugged in through the
//! [`CoreModel`] signal contract. [`CoreSystem`] connects such a model to the bus:
//! 1. **Reset:** The core is held in reset for a number of cycles after init.
//! 2. **Debug registers:** A bus slave whose transfers are forwarded to the core's
//!    debug-register interface and answered in the same cycle.
//! 3. **Memory:** A bus master carrying the core's memory requests. All lane groups
//!    are stalled while a request is outstanding.

use tracing::{error, info};

use crate::common::error::SimError;
use crate::common::shared::Shared;
use crate::config::CoreConfig;
use crate::sim::entity::{Entity, Flow};
use crate::soc::interconnect::signals::{BusRequest, MasterHandle, ResponseState, SlavePort};

/// Debug-register transfer presented to the core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugRegisterAccess {
    /// Register address (offset within the debug window).
    pub address: u32,
    /// Read strobe.
    pub read_enable: bool,
    /// Write strobe.
    pub write_enable: bool,
    /// Byte-lane write mask.
    pub write_mask: u8,
    /// Write data.
    pub write_data: u32,
}

/// Completion of a memory request, visible to the core for one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryResponse {
    /// Read data, or the fault code if `fault` is set.
    pub data: u32,
    /// Whether the bus faulted.
    pub fault: bool,
}

/// Signals driven into the core each cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreInputs {
    /// Reset line.
    pub reset: bool,
    /// Stall line per lane group.
    pub stall: Vec<bool>,
    /// Debug-register transfer of this cycle.
    pub debug: DebugRegisterAccess,
    /// Memory response of this cycle.
    pub memory_response: Option<MemoryResponse>,
}

/// Signals driven by the core each cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreOutputs {
    /// Stall request per lane group.
    pub stall: Vec<bool>,
    /// Debug-register read data.
    pub debug_read_data: u32,
    /// New memory request, considered only when none is outstanding.
    pub memory_request: Option<BusRequest>,
    /// Set when the model hit an unrecoverable condition.
    pub error: bool,
}

/// The signal contract of a simulated core.
pub trait CoreModel: Send {
    /// Simulates one clock cycle.
    fn clock(&mut self, inputs: &CoreInputs) -> CoreOutputs;
}

/// Progress of the core's memory request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemoryState {
    /// Nothing outstanding.
    #[default]
    Idle,
    /// Presented on the bus, not acknowledged yet.
    Requested,
    /// Accepted by the bus, waiting for the response.
    AwaitingResponse,
}

/// Entity wrapping a [`CoreModel`].
pub struct CoreSystem<M> {
    name: String,
    model: M,
    lane_groups: usize,
    reset_cycles: u32,
    reset_remaining: u32,
    debug_slave: Shared<SlavePort>,
    memory: MasterHandle,
    memory_state: MemoryState,
    stall_out: Vec<bool>,
    error: bool,
    cycles: u64,
}

impl<M> std::fmt::Debug for CoreSystem<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreSystem")
            .field("name", &self.name)
            .field("lane_groups", &self.lane_groups)
            .field("memory_state", &self.memory_state)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl<M: CoreModel> CoreSystem<M> {
    /// Wraps `model`.
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name.
    /// * `model` - The core.
    /// * `config` - Lane groups and reset length.
    /// * `debug_slave` - Slave port for the debug register window.
    /// * `memory` - Master handle for the core's memory interface.
    pub fn new(
        name: impl Into<String>,
        model: M,
        config: &CoreConfig,
        debug_slave: Shared<SlavePort>,
        memory: MasterHandle,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            lane_groups: config.lane_groups,
            reset_cycles: config.reset_cycles,
            reset_remaining: 0,
            debug_slave,
            memory,
            memory_state: MemoryState::Idle,
            stall_out: vec![false; config.lane_groups],
            error: false,
            cycles: 0,
        }
    }

    /// State of the memory interface.
    pub const fn memory_state(&self) -> MemoryState {
        self.memory_state
    }

    /// Stall requests the core drove in the last cycle.
    pub fn stall_out(&self) -> &[bool] {
        &self.stall_out
    }

    /// Collects the memory response and advances the request state.
    fn sample_memory(&mut self) -> Option<MemoryResponse> {
        let mut port = self.memory.port.lock();
        let response = port.response;
        let mut completed = None;

        if self.memory_state != MemoryState::Idle && response.is_done_for(self.memory.id) {
            completed = Some(MemoryResponse {
                data: response.data,
                fault: response.state == ResponseState::Fault,
            });
            self.memory_state = MemoryState::Idle;
        }
        if self.memory_state == MemoryState::Requested && port.ack {
            port.request = BusRequest::default();
            self.memory_state = MemoryState::AwaitingResponse;
        }
        completed
    }
}

impl<M: CoreModel> Entity for CoreSystem<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<(), SimError> {
        self.reset_remaining = self.reset_cycles;
        Ok(())
    }

    fn clock(&mut self) {
        let reset = self.reset_remaining > 0;
        self.reset_remaining = self.reset_remaining.saturating_sub(1);

        let memory_response = self.sample_memory();
        let outstanding = self.memory_state != MemoryState::Idle;

        let mut slave = self.debug_slave.lock();
        let debug = slave.request.map_or_else(DebugRegisterAccess::default, |request| DebugRegisterAccess {
            address: request.address,
            read_enable: request.is_read(),
            write_enable: !request.is_read(),
            write_mask: request.mask,
            write_data: request.data,
        });

        let inputs = CoreInputs {
            reset,
            stall: vec![outstanding; self.lane_groups],
            debug,
            memory_response,
        };
        let outputs = self.model.clock(&inputs);

        if slave.request.is_some() {
            slave.response.state = ResponseState::Ok;
            slave.response.data = outputs.debug_read_data;
        }
        drop(slave);

        if self.memory_state == MemoryState::Idle && !reset {
            if let Some(request) = outputs.memory_request {
                self.memory.port.lock().request = request;
                self.memory_state = MemoryState::Requested;
            }
        }

        self.stall_out = outputs.stall;
        self.error |= outputs.error;
        self.cycles += 1;
    }

    fn synchronize(&mut self) -> Flow {
        if self.error {
            error!("{}: core reported an error at cycle {}", self.name, self.cycles);
            return Flow::Stop;
        }
        Flow::Continue
    }

    fn fini(&mut self) {
        info!("{}: {} cycles simulated", self.name, self.cycles);
    }
}
