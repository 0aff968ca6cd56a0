//! The debug port bus master.
//!
//! The port owns a [`DebugServer`] and executes the accesses its clients issue. An
//! access becomes one bus request per word: `BurstStart` for the first word and
//! `BurstCont` for the rest, so the port keeps the bus for the whole access. A new
//! word is only presented after the bus acknowledged the previous one.
//!
//! Phases:
//! 1. **`clock`:** Consume the response addressed to this master and present the
//!    next request.
//! 2. **`synchronize`:** Reply for a completed access and pick up the next one.
//! 3. **`occasional`:** Service the TCP server (accept, receive, parse).
//!
//! After a fault the remaining words are abandoned, but one of them may already be
//! in flight. The port then drains: it stays idle until no transfer of its own is
//! busy on the bus, so the stale response cannot be credited to the next access.

use std::net::SocketAddr;

use tracing::{debug, info};

use crate::common::error::SimError;
use crate::config::DebugConfig;
use crate::net::DebugServer;
use crate::sim::entity::{Entity, Flow};
use crate::soc::debug::access::{AccessKind, AccessOutcome, PendingAccess};
use crate::soc::interconnect::signals::{BusRequest, MasterHandle, RequestState, ResponseState};
use crate::soc::memory::Direction;

/// Bus master serving debug clients over TCP.
#[derive(Debug)]
pub struct DebugPort {
    name: String,
    tcp_port: u16,
    server: DebugServer,
    master: MasterHandle,
    pending: Option<PendingAccess>,
    requested: usize,
    responded: usize,
    completed: Option<PendingAccess>,
    draining: bool,
}

impl DebugPort {
    /// Creates a debug port.
    ///
    /// # Arguments
    ///
    /// * `name` - Instance name, also used for the TCP server.
    /// * `config` - TCP port and protocol limits.
    /// * `master` - Master handle obtained from [`crate::soc::interconnect::Bus::add_master`].
    pub fn new(name: impl Into<String>, config: &DebugConfig, master: MasterHandle) -> Self {
        let name = name.into();
        Self {
            server: DebugServer::new(name.clone(), config),
            name,
            tcp_port: config.port,
            master,
            pending: None,
            requested: 0,
            responded: 0,
            completed: None,
            draining: false,
        }
    }

    /// Opens the TCP server now instead of in `init`.
    ///
    /// # Returns
    ///
    /// The bound address; useful with port 0 to learn the chosen port.
    pub fn bind(&mut self) -> Result<SocketAddr, SimError> {
        self.server.open(self.tcp_port).map_err(|source| SimError::Bind {
            name: self.name.clone(),
            port: self.tcp_port,
            source,
        })
    }

    /// Bound address of the TCP server, if open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }

    /// Starts executing `access`, or returns it if it completes without bus traffic.
    fn start(&mut self, mut access: PendingAccess) -> Option<PendingAccess> {
        if access.kind() == AccessKind::Rom {
            debug!("{}: no debug ROM on this platform", self.name);
            access.complete(AccessOutcome::Error);
            return Some(access);
        }
        if access.num_words() == 0 {
            access.complete(AccessOutcome::Ok);
            return Some(access);
        }
        self.requested = 0;
        self.responded = 0;
        self.pending = Some(access);
        None
    }
}

impl Entity for DebugPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<(), SimError> {
        if !self.server.is_open() {
            let _addr = self.bind()?;
        }
        Ok(())
    }

    fn clock(&mut self) {
        let id = self.master.id;
        let mut port = self.master.port.lock();
        let response = port.response;

        if self.draining {
            port.request = BusRequest::default();
            self.draining = response.state == ResponseState::Busy && response.master == Some(id);
            return;
        }

        let Some(access) = self.pending.as_mut() else {
            port.request = BusRequest::default();
            return;
        };

        if response.master == Some(id) {
            match response.state {
                ResponseState::Ok => {
                    if access.direction() == Direction::Read {
                        access.set_word(self.responded, response.data);
                    }
                    self.responded += 1;
                    if self.responded == access.num_words() {
                        access.complete(AccessOutcome::Ok);
                    }
                }
                ResponseState::Fault => {
                    access.complete(AccessOutcome::Fault(response.data));
                    self.draining = true;
                }
                ResponseState::Idle | ResponseState::Busy => {}
            }
        }

        if access.is_complete() {
            port.request = BusRequest::default();
            self.completed = self.pending.take();
            return;
        }

        if !port.ack {
            return;
        }
        if self.requested < access.num_words() {
            let index = self.requested;
            let state = if index == 0 {
                RequestState::BurstStart
            } else {
                RequestState::BurstCont
            };
            let address = access.word_address(index);
            port.request = match access.direction() {
                Direction::Read => BusRequest::read(state, address),
                Direction::Write => BusRequest::write(state, address, access.word_mask(index), access.word(index)),
            };
            self.requested += 1;
        } else {
            port.request = BusRequest::default();
        }
    }

    fn synchronize(&mut self) -> Flow {
        if let Some(done) = self.completed.take() {
            self.server.finish_access(&done);
        }
        if self.pending.is_none() && !self.draining {
            if let Some(access) = self.server.take_access() {
                if let Some(done) = self.start(access) {
                    self.server.finish_access(&done);
                }
            }
        }
        if self.server.stop_requested() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn occasional(&mut self) -> Flow {
        self.server.update();
        Flow::Continue
    }

    fn fini(&mut self) {
        self.server.close();
        info!("{}: debug port closed", self.name);
    }
}
