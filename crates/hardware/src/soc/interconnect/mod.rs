//! System interconnect (bus) between masters and slaves.
//!
//! This module implements the platform bus. It provides:
//! 1. **Registration:** Masters get a port and an identity, slaves get a port and a
//!    demux function that claims part of the address space.
//! 2. **Arbitration:** Round-robin among requesting masters, except that a master
//!    issuing locked or burst transfers keeps the bus until it goes idle.
//! 3. **Routing:** The winning request is demultiplexed to the first slave that claims
//!    it, or to an internal unmapped slave that always faults.
//! 4. **Broadcast:** The single bus-wide response and snoop record are copied to every
//!    master port each cycle; only the master named in the response acts on it.
//!
//! The bus holds at most one transfer at a time and owns no data besides it.

/// Address demultiplexing helpers.
pub mod demux;

/// Request, response and port records.
pub mod signals;

use std::fmt;

use tracing::{debug, trace};

use self::demux::DemuxFn;
use self::signals::{
    BusRequest, BusResponse, BusSnoop, MasterHandle, MasterId, MasterPort, RequestState,
    ResponseState, SlavePort,
};
use crate::common::constants::UNMAPPED_FAULT_CODE;
use crate::common::shared::Shared;
use crate::sim::entity::{Entity, Flow};

/// Which slave holds the current transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlaveRef {
    Mapped(usize),
    Unmapped,
}

/// The transfer currently handed to a slave.
#[derive(Clone, Copy, Debug)]
struct Transfer {
    slave: SlaveRef,
    master: MasterId,
    original_address: u32,
}

struct SlaveEntry {
    port: Shared<SlavePort>,
    demux: DemuxFn,
}

/// Transfer counters of a bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Transfers that completed with `Ok`.
    pub completed: u64,
    /// Transfers that completed with `Fault`.
    pub faulted: u64,
}

/// Shared bus with round-robin arbitration.
pub struct Bus {
    name: String,
    masters: Vec<Shared<MasterPort>>,
    slaves: Vec<SlaveEntry>,
    unmapped: SlavePort,
    current: Option<Transfer>,
    current_request: BusRequest,
    current_master: usize,
    response: BusResponse,
    snoop: BusSnoop,
    stats: BusStats,
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("name", &self.name)
            .field("masters", &self.masters.len())
            .field("slaves", &self.slaves.len())
            .field("current", &self.current)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Bus {
    /// Creates a bus with no masters or slaves.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            masters: Vec::new(),
            slaves: Vec::new(),
            unmapped: SlavePort::default(),
            current: None,
            current_request: BusRequest::default(),
            current_master: 0,
            response: BusResponse::default(),
            snoop: BusSnoop::default(),
            stats: BusStats::default(),
        }
    }

    /// Registers a master and returns its port.
    ///
    /// Masters are polled in registration order during round-robin arbitration.
    pub fn add_master(&mut self) -> MasterHandle {
        let id = MasterId(self.masters.len());
        let port = Shared::new(MasterPort::default());
        self.masters.push(port.clone());
        MasterHandle { id, port }
    }

    /// Registers a slave behind `demux` and returns its port.
    ///
    /// # Arguments
    ///
    /// * `demux` - Maps a bus address to an offset within the slave, or `None`
    ///   if the slave does not claim it. Earlier slaves take precedence.
    pub fn add_slave(&mut self, demux: impl Fn(u32) -> Option<u32> + Send + 'static) -> Shared<SlavePort> {
        let port = Shared::new(SlavePort::default());
        self.slaves.push(SlaveEntry {
            port: port.clone(),
            demux: Box::new(demux),
        });
        port
    }

    /// Number of registered masters.
    pub fn master_count(&self) -> usize {
        self.masters.len()
    }

    /// Transfer counters.
    pub const fn stats(&self) -> BusStats {
        self.stats
    }

    /// Finds the slave claiming `address` and the offset within it.
    fn demux(&self, address: u32) -> (SlaveRef, u32) {
        self.slaves
            .iter()
            .enumerate()
            .find_map(|(index, slave)| (slave.demux)(address).map(|offset| (SlaveRef::Mapped(index), offset)))
            .unwrap_or((SlaveRef::Unmapped, address))
    }

    fn slave_response(&self, slave: SlaveRef) -> BusResponse {
        match slave {
            SlaveRef::Mapped(index) => self.slaves[index].port.lock().response,
            SlaveRef::Unmapped => self.unmapped.response,
        }
    }

    fn with_slave<R>(&mut self, slave: SlaveRef, f: impl FnOnce(&mut SlavePort) -> R) -> R {
        match slave {
            SlaveRef::Mapped(index) => self.slaves[index].port.with(f),
            SlaveRef::Unmapped => f(&mut self.unmapped),
        }
    }

    /// Picks the master whose request is handled next.
    fn arbitrate(&mut self) {
        if self.current_request.state.retains_bus() {
            return;
        }
        let count = self.masters.len();
        let start = (self.current_master + 1) % count;
        for step in 0..count {
            let index = (start + step) % count;
            if self.masters[index].lock().request.state != RequestState::Idle {
                self.current_master = index;
                return;
            }
        }
    }

    /// Forwards the current slave's response and releases it once it is done.
    fn handle_transfer(&mut self, transfer: Transfer) {
        let response = self.slave_response(transfer.slave);
        self.response.state = response.state;
        self.response.master = Some(transfer.master);
        if response.state == ResponseState::Busy {
            return;
        }

        self.response.data = response.data;
        self.snoop = BusSnoop {
            address: transfer.original_address,
            mask: self.current_request.mask,
        };
        match response.state {
            ResponseState::Fault => self.stats.faulted += 1,
            _ => self.stats.completed += 1,
        }
        trace!(
            "{}: {:?} {:#010x} mask {:x} -> {:?} {:08x} for master {}",
            self.name,
            self.current_request.state,
            transfer.original_address,
            self.current_request.mask,
            response.state,
            response.data,
            transfer.master.0
        );
        self.with_slave(transfer.slave, |port| port.request = None);
        self.current = None;
    }

    /// Latches the current master's request and hands it to its slave.
    fn start_transfer(&mut self) {
        let index = self.current_master;
        let request = self.masters[index].with(|port| {
            (port.request.state != RequestState::Idle).then(|| {
                port.ack = true;
                port.request
            })
        });
        let Some(request) = request else {
            self.current_request.state = RequestState::Idle;
            return;
        };

        self.current_request = request;
        let (slave, offset) = self.demux(request.address);
        let master = MasterId(index);
        self.with_slave(slave, |port| {
            port.request = Some(BusRequest {
                address: offset,
                ..request
            });
            port.response = BusResponse {
                state: ResponseState::Busy,
                data: 0,
                master: Some(master),
            };
        });
        self.current = Some(Transfer {
            slave,
            master,
            original_address: request.address,
        });
    }
}

impl Entity for Bus {
    fn name(&self) -> &str {
        &self.name
    }

    /// Drives the unmapped slave, which faults every transfer it is handed.
    fn clock(&mut self) {
        if self.unmapped.request.is_some() {
            self.unmapped.response.state = ResponseState::Fault;
            self.unmapped.response.data = UNMAPPED_FAULT_CODE;
        }
    }

    fn synchronize(&mut self) -> Flow {
        for master in &self.masters {
            master.with(|port| port.ack = port.request.state == RequestState::Idle);
        }

        match self.current {
            Some(transfer) => self.handle_transfer(transfer),
            None => self.response = BusResponse::default(),
        }

        if self.current.is_none() && !self.masters.is_empty() {
            self.arbitrate();
            self.start_transfer();
        }

        for master in &self.masters {
            master.with(|port| {
                port.response = self.response;
                port.snoop = self.snoop;
            });
        }
        Flow::Continue
    }

    fn fini(&mut self) {
        debug!(
            "{}: {} transfers completed, {} faulted",
            self.name, self.stats.completed, self.stats.faulted
        );
    }
}
