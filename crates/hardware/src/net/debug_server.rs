//! Debug command server.
//!
//! The `DebugServer` turns client commands into [`PendingAccess`] records for the
//! debug port to execute, and sends the replies back. Only one access exists at a
//! time, server-wide: while it is in flight no connection is read or parsed, and
//! the connection that issued it stops parsing its buffered input right after the
//! command. The reply goes only to the issuing connection, and then the gate
//! reopens.
//!
//! A connection reads at most one receive chunk per update, and only after its
//! previous chunk is fully parsed, so unparsed input never exceeds one chunk.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

use tracing::{debug, info};

use crate::common::shared::{Shared, WeakShared};
use crate::config::DebugConfig;
use crate::net::protocol::{
    Command, CommandAssembler, Frame, ProtocolError, parse_command, render_completion, render_error,
    render_stop,
};
use crate::net::tcp::{Connection, ConnectionHandler, IoMode, TcpServer};
use crate::soc::debug::access::PendingAccess;

/// Bytes read from a socket per receive call.
const RECEIVE_CHUNK: usize = 1024;

/// Per-connection protocol state.
#[derive(Debug)]
pub struct DebugSession {
    assembler: CommandAssembler,
    inbox: VecDeque<u8>,
}

impl DebugSession {
    /// Bytes received but not parsed yet.
    pub fn buffered(&self) -> usize {
        self.inbox.len()
    }
}

/// Command dispatch state, separate from the socket list it services.
#[derive(Debug)]
struct Dispatcher {
    name: String,
    max_command_size: usize,
    max_access_size: usize,
    queued: Option<PendingAccess>,
    origin: Option<WeakShared<Connection<DebugSession>>>,
    stop_requested: bool,
}

impl Dispatcher {
    /// Handles one frame and returns the immediate reply, if any.
    fn handle_frame(&mut self, frame: &Frame, connection: &Shared<Connection<DebugSession>>) -> Option<String> {
        let (name, params) = frame.split();
        if frame.overrun {
            return Some(render_error(name, ProtocolError::CmdBufferOverrun, self.max_command_size));
        }

        match parse_command(name, params, self.max_access_size) {
            Ok(Command::Stop) => {
                info!("{}: stop requested by client", self.name);
                self.stop_requested = true;
                Some(render_stop())
            }
            Ok(Command::Access(access)) => {
                debug!(
                    "{}: {} {:08X} ({} bytes)",
                    self.name,
                    access.command(),
                    access.address(),
                    access.count()
                );
                self.queued = Some(access);
                self.origin = Some(connection.downgrade());
                None
            }
            Err(err) => {
                debug!("{}: {name} rejected: {err}", self.name);
                Some(render_error(name, err, self.max_command_size))
            }
        }
    }

    const fn is_busy(&self) -> bool {
        self.origin.is_some()
    }
}

impl ConnectionHandler for Dispatcher {
    type Session = DebugSession;

    fn open_session(&mut self, _peer: SocketAddr) -> DebugSession {
        DebugSession {
            assembler: CommandAssembler::new(self.max_command_size),
            inbox: VecDeque::new(),
        }
    }

    fn update_connection(&mut self, connection: &Shared<Connection<DebugSession>>) -> bool {
        let mut guard = connection.lock();
        let Connection { tcp, session } = &mut *guard;

        // One chunk per update, and only once the previous one is parsed.
        if session.inbox.is_empty() {
            let mut chunk = [0u8; RECEIVE_CHUNK];
            let received = tcp.receive(&mut chunk, IoMode::NonBlocking);
            session.inbox.extend(&chunk[..received]);
        }

        while !self.is_busy() {
            let Some(byte) = session.inbox.pop_front() else {
                break;
            };
            let Some(frame) = session.assembler.push(byte) else {
                continue;
            };
            if let Some(reply) = self.handle_frame(&frame, connection) {
                let _sent = tcp.transmit(reply.as_bytes(), IoMode::Blocking);
            }
        }

        tcp.is_open()
    }

    fn can_update_clients(&self) -> bool {
        !self.is_busy()
    }
}

/// TCP command server for debug accesses.
#[derive(Debug)]
pub struct DebugServer {
    tcp: TcpServer<DebugSession>,
    dispatcher: Dispatcher,
}

impl DebugServer {
    /// Creates a closed server.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in log output.
    /// * `config` - Buffer and access limits; the port is passed to [`Self::open`].
    pub fn new(name: impl Into<String>, config: &DebugConfig) -> Self {
        let name = name.into();
        Self {
            tcp: TcpServer::new(name.clone()),
            dispatcher: Dispatcher {
                name,
                max_command_size: config.max_command_size,
                max_access_size: config.max_access_size,
                queued: None,
                origin: None,
                stop_requested: false,
            },
        }
    }

    /// Starts listening on `port`.
    pub fn open(&mut self, port: u16) -> io::Result<SocketAddr> {
        self.tcp.open(port)
    }

    /// Whether the server is listening.
    pub const fn is_open(&self) -> bool {
        self.tcp.is_open()
    }

    /// Bound address, if open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.tcp.local_addr()
    }

    /// Accepts new clients and parses pending input, unless an access is in flight.
    pub fn update(&mut self) {
        self.tcp.update(&mut self.dispatcher);
    }

    /// Takes the access parsed by the last [`Self::update`], if any.
    ///
    /// The gate stays closed until [`Self::finish_access`] is called.
    pub fn take_access(&mut self) -> Option<PendingAccess> {
        self.dispatcher.queued.take()
    }

    /// Replies to the issuing client and reopens the gate.
    ///
    /// The reply is dropped if that client disconnected in the meantime.
    pub fn finish_access(&mut self, access: &PendingAccess) {
        let reply = render_completion(access);
        let origin = self.dispatcher.origin.take().and_then(|origin| origin.upgrade());
        match origin {
            Some(connection) => {
                let _sent = connection.lock().tcp.transmit(reply.as_bytes(), IoMode::Blocking);
            }
            None => debug!("{}: client left before reply {reply}", self.dispatcher.name),
        }
    }

    /// Whether an access is in flight (queued or being executed).
    pub const fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    /// Whether the server is accepting commands from clients.
    pub fn can_update_clients(&self) -> bool {
        self.dispatcher.can_update_clients()
    }

    /// Whether a client sent `Stop`.
    pub const fn stop_requested(&self) -> bool {
        self.dispatcher.stop_requested
    }

    /// Number of connected clients.
    pub fn connection_count(&self) -> usize {
        self.tcp.connection_count()
    }

    /// Bytes received from clients but not parsed yet, over all connections.
    pub fn buffered(&self) -> usize {
        self.tcp
            .connections()
            .iter()
            .filter_map(WeakShared::upgrade)
            .map(|connection| connection.lock().session.buffered())
            .sum()
    }

    /// Disconnects every client and stops listening.
    pub fn close(&mut self) {
        self.tcp.close();
    }
}
