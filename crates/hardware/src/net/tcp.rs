//! Non-blocking TCP server plumbing.
//!
//! This module provides the socket layer under the debug server:
//! 1. **`TcpConnection`:** One client socket with non-blocking and blocking
//!    receive/transmit. Blocking mode waits for readiness with `poll(2)`.
//! 2. **`TcpServer`:** A listening socket plus the list of live connections. Each
//!    `update` accepts at most one new client and then lets a
//!    [`ConnectionHandler`] service the connections in registration order.
//!
//! Connections are owned by the server's list. Anything else (such as an in-flight
//! command waiting for its reply) holds a [`WeakShared`] and must cope with the
//! connection being gone.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::os::fd::AsRawFd;

use tracing::{info, warn};

use crate::common::shared::{Shared, WeakShared};

/// How a receive or transmit call deals with a socket that is not ready.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoMode {
    /// Move what can be moved now and return.
    NonBlocking,
    /// Wait until the whole buffer was moved or the connection died.
    Blocking,
}

/// One client connection.
#[derive(Debug)]
pub struct TcpConnection {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl TcpConnection {
    /// Wraps an accepted stream, switching it to non-blocking, no-delay mode.
    pub fn new(stream: TcpStream, peer: SocketAddr) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Some(stream),
            peer,
        })
    }

    /// Address of the remote end.
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the socket is still open.
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Closes the socket. Further I/O moves nothing.
    pub fn close(&mut self) {
        self.stream = None;
    }

    /// Receives into `buffer`.
    ///
    /// Stops early when no data is available (non-blocking mode only), at end of
    /// file, or on an error. The last two close the connection.
    ///
    /// # Returns
    ///
    /// The number of bytes received.
    pub fn receive(&mut self, buffer: &mut [u8], mode: IoMode) -> usize {
        self.transfer(buffer.len(), mode, libc::POLLIN, |stream, done| stream.read(&mut buffer[done..]))
    }

    /// Transmits `buffer`, with the same stopping rules as [`Self::receive`].
    ///
    /// # Returns
    ///
    /// The number of bytes sent.
    pub fn transmit(&mut self, buffer: &[u8], mode: IoMode) -> usize {
        self.transfer(buffer.len(), mode, libc::POLLOUT, |stream, done| stream.write(&buffer[done..]))
    }

    fn transfer(
        &mut self,
        len: usize,
        mode: IoMode,
        events: libc::c_short,
        mut op: impl FnMut(&mut TcpStream, usize) -> io::Result<usize>,
    ) -> usize {
        let mut done = 0;
        while done < len {
            let Some(stream) = self.stream.as_mut() else {
                break;
            };
            match op(stream, done) {
                Ok(0) => {
                    self.close();
                    break;
                }
                Ok(n) => done += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => match mode {
                    IoMode::NonBlocking => break,
                    IoMode::Blocking => wait_ready(stream, events),
                },
                Err(err) => {
                    warn!("connection to {}: {err}", self.peer);
                    self.close();
                    break;
                }
            }
        }
        done
    }
}

/// Blocks until `stream` is ready for `events` or in an error/hangup state.
fn wait_ready(stream: &TcpStream, events: libc::c_short) {
    let mut fd = libc::pollfd {
        fd: stream.as_raw_fd(),
        events,
        revents: 0,
    };
    // SAFETY: `fd` is a valid, initialized pollfd that outlives the call, and the
    // count of 1 matches the single entry passed.
    let _ready = unsafe { libc::poll(&raw mut fd, 1, -1) };
}

/// A connection together with the per-client state of its handler.
#[derive(Debug)]
pub struct Connection<S> {
    /// The socket.
    pub tcp: TcpConnection,
    /// Handler-specific session state.
    pub session: S,
}

/// Callbacks that give a [`TcpServer`] its behavior.
pub trait ConnectionHandler {
    /// Per-connection state.
    type Session;

    /// Creates the session for a newly accepted client.
    fn open_session(&mut self, peer: SocketAddr) -> Self::Session;

    /// Services one connection.
    ///
    /// # Returns
    ///
    /// `false` if the connection is dead and should be removed.
    fn update_connection(&mut self, connection: &Shared<Connection<Self::Session>>) -> bool;

    /// Whether connections may be serviced right now.
    fn can_update_clients(&self) -> bool {
        true
    }
}

/// Listening socket and its live connections.
#[derive(Debug)]
pub struct TcpServer<S> {
    name: String,
    listener: Option<TcpListener>,
    connections: Vec<Shared<Connection<S>>>,
}

impl<S> TcpServer<S> {
    /// Creates a closed server.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listener: None,
            connections: Vec::new(),
        }
    }

    /// Starts listening on `port` on all interfaces. Port 0 picks a free port.
    ///
    /// # Returns
    ///
    /// The bound local address.
    pub fn open(&mut self, port: u16) -> io::Result<SocketAddr> {
        info!("trying to open TCP server '{}' socket at port {port}", self.name);
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        info!("TCP server '{}' listening on port {}", self.name, addr.port());
        Ok(addr)
    }

    /// Local address, if open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Whether the server is listening.
    pub const fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Accepts at most one client, then services connections until the handler
    /// stops allowing it. Dead connections are dropped from the list.
    pub fn update<H>(&mut self, handler: &mut H)
    where
        H: ConnectionHandler<Session = S>,
    {
        self.accept(handler);

        let mut index = 0;
        while index < self.connections.len() {
            if !handler.can_update_clients() {
                break;
            }
            if handler.update_connection(&self.connections[index]) {
                index += 1;
                continue;
            }
            let connection = self.connections.remove(index);
            let mut connection = connection.lock();
            info!("TCP server '{}' lost connection to {}", self.name, connection.tcp.peer_addr());
            connection.tcp.close();
        }
    }

    fn accept<H>(&mut self, handler: &mut H)
    where
        H: ConnectionHandler<Session = S>,
    {
        let Some(listener) = &self.listener else {
            return;
        };
        match listener.accept() {
            Ok((stream, peer)) => match TcpConnection::new(stream, peer) {
                Ok(tcp) => {
                    info!("TCP server '{}' accepted connection from {peer}", self.name);
                    let session = handler.open_session(peer);
                    self.connections.push(Shared::new(Connection { tcp, session }));
                }
                Err(err) => warn!("TCP server '{}': failed to set up connection from {peer}: {err}", self.name),
            },
            Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {}
            Err(err) => warn!("TCP server '{}': failed to accept incoming connection: {err}", self.name),
        }
    }

    /// Non-owning references to the live connections, in registration order.
    pub fn connections(&self) -> Vec<WeakShared<Connection<S>>> {
        self.connections.iter().map(Shared::downgrade).collect()
    }

    /// Closes every connection and the listening socket.
    pub fn close(&mut self) {
        for connection in self.connections.drain(..) {
            connection.lock().tcp.close();
        }
        if self.listener.take().is_some() {
            info!("TCP server '{}' closed", self.name);
        }
    }
}

impl<S> Drop for TcpServer<S> {
    fn drop(&mut self) {
        self.close();
    }
}
