//! Bus signal records.
//!
//! These are the wires between the bus and its participants. A master drives a
//! [`BusRequest`] and samples the broadcast [`BusResponse`]; a slave samples the
//! request the bus latched for it and drives its own response.

use crate::common::shared::Shared;

/// Identity of a bus master, assigned in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MasterId(pub usize);

/// Request state driven by a master.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestState {
    /// No request.
    #[default]
    Idle,
    /// A single transfer; arbitration is released afterwards.
    Single,
    /// A transfer that keeps arbitration with this master afterwards.
    Lock,
    /// First transfer of a burst; arbitration stays with this master.
    BurstStart,
    /// Continuation of a burst.
    BurstCont,
}

impl RequestState {
    /// Whether arbitration stays with the master after a transfer in this state.
    pub const fn retains_bus(self) -> bool {
        matches!(self, Self::Lock | Self::BurstStart | Self::BurstCont)
    }
}

/// A transfer request.
///
/// `mask` is the byte-lane write enable. Zero means read. Bit 3 selects the most
/// significant byte of `data`, which is the byte at the lowest address of the word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusRequest {
    /// Request state.
    pub state: RequestState,
    /// Word address (master space before demux, slave offset after).
    pub address: u32,
    /// Byte-lane write mask, 0 for reads.
    pub mask: u8,
    /// Write data, big-endian byte lanes.
    pub data: u32,
}

impl BusRequest {
    /// A read of the word at `address`.
    pub const fn read(state: RequestState, address: u32) -> Self {
        Self {
            state,
            address,
            mask: 0,
            data: 0,
        }
    }

    /// A write of the lanes in `mask` of `data` to the word at `address`.
    pub const fn write(state: RequestState, address: u32, mask: u8, data: u32) -> Self {
        Self {
            state,
            address,
            mask,
            data,
        }
    }

    /// Whether this request is a read.
    pub const fn is_read(&self) -> bool {
        self.mask == 0
    }
}

/// Response state driven by the slave handling the current transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseState {
    /// No transfer in progress.
    #[default]
    Idle,
    /// The slave is still working on the transfer.
    Busy,
    /// The transfer completed; `data` holds read data.
    Ok,
    /// The transfer failed; `data` holds the fault code.
    Fault,
}

/// The bus-wide response, broadcast to every master each cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusResponse {
    /// Response state.
    pub state: ResponseState,
    /// Read data or fault code.
    pub data: u32,
    /// Master that owns the transfer this response belongs to.
    pub master: Option<MasterId>,
}

impl BusResponse {
    /// Whether this response completes a transfer of `master`.
    pub fn is_done_for(&self, master: MasterId) -> bool {
        self.master == Some(master) && matches!(self.state, ResponseState::Ok | ResponseState::Fault)
    }
}

/// Description of the transfer that completed in the last bus cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusSnoop {
    /// Address of the transfer in master address space.
    pub address: u32,
    /// Byte-lane write mask of the transfer.
    pub mask: u8,
}

/// Signals owned by one bus master.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MasterPort {
    /// Request driven by the master.
    pub request: BusRequest,
    /// Set by the bus when `request` was accepted (or is idle); the master may
    /// only change its request after seeing this.
    pub ack: bool,
    /// Copy of the bus-wide response.
    pub response: BusResponse,
    /// Copy of the bus-wide snoop record.
    pub snoop: BusSnoop,
}

impl Default for MasterPort {
    fn default() -> Self {
        Self {
            request: BusRequest::default(),
            ack: true,
            response: BusResponse::default(),
            snoop: BusSnoop::default(),
        }
    }
}

/// Signals owned by one bus slave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlavePort {
    /// The transfer the bus handed to this slave, with the address rewritten to
    /// the slave's offset. `None` when the slave is not selected.
    pub request: Option<BusRequest>,
    /// Response driven by the slave.
    pub response: BusResponse,
}

/// Master-side handle returned by [`super::Bus::add_master`].
#[derive(Clone, Debug)]
pub struct MasterHandle {
    /// The identity responses are tagged with.
    pub id: MasterId,
    /// The port record shared with the bus.
    pub port: Shared<MasterPort>,
}
