use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rvex_sim::sim::simulation::StopHandle;
use rvex_sim::stats::SimStats;
use rvex_sim::{Config, PlatformBuilder, SimError};
use tracing_subscriber::EnvFilter;

/// How long a test waits for a reply before giving up.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Installs a test-friendly tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Default configuration with an ephemeral debug port and short batches, so that
/// the debug server is serviced often.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.debug.port = 0;
    config.simulation.batch_cycles = 64;
    config
}

/// A platform running in a background thread.
///
/// Dropping the handle stops the simulation and waits for the thread.
pub struct TestPlatform {
    addr: SocketAddr,
    stop: StopHandle,
    thread: Option<JoinHandle<Result<SimStats, SimError>>>,
}

impl TestPlatform {
    /// Builds a platform from `config` and starts it.
    pub fn start(config: Config) -> Self {
        Self::start_with(PlatformBuilder::new(config))
    }

    /// Builds the platform described by `builder` and starts it.
    pub fn start_with(builder: PlatformBuilder) -> Self {
        init_tracing();
        let mut platform = builder.build().unwrap();
        let addr = platform.debug_addr();
        let stop = platform.stop_handle();
        let thread = thread::spawn(move || platform.run());
        Self {
            addr,
            stop,
            thread: Some(thread),
        }
    }

    /// Port the debug server listens on.
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Opens a new debug connection.
    pub fn connect(&self) -> TestClient {
        TestClient::connect(self.port())
    }

    /// Waits for the simulation to end on its own and returns its result.
    pub fn join(mut self) -> Result<SimStats, SimError> {
        let thread = self.thread.take().unwrap();
        let deadline = Instant::now() + REPLY_TIMEOUT;
        while !thread.is_finished() {
            assert!(Instant::now() < deadline, "simulation did not stop");
            thread::sleep(Duration::from_millis(1));
        }
        thread.join().unwrap()
    }
}

impl Drop for TestPlatform {
    fn drop(&mut self) {
        self.stop.stop();
        if let Some(thread) = self.thread.take() {
            let _result = thread.join();
        }
    }
}

/// A debug client speaking the text protocol.
pub struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    /// Connects to the debug server on `port` of the local host.
    pub fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.set_read_timeout(Some(REPLY_TIMEOUT)).unwrap();
        stream.set_nodelay(true).unwrap();
        Self { stream }
    }

    /// Sends raw text without waiting for a reply.
    pub fn send(&mut self, text: &str) {
        self.stream.write_all(text.as_bytes()).unwrap();
    }

    /// Reads one reply, up to and including its `;`.
    pub fn reply(&mut self) -> String {
        let mut reply = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.stream.read(&mut byte).unwrap();
            assert!(n == 1, "connection closed after {:?}", String::from_utf8_lossy(&reply));
            reply.push(byte[0]);
            if byte[0] == b';' {
                return String::from_utf8(reply).unwrap();
            }
        }
    }

    /// Sends `text` and returns the reply.
    pub fn command(&mut self, text: &str) -> String {
        self.send(text);
        self.reply()
    }
}

/// Calls `step` until it returns true, failing the test after the reply timeout.
pub fn wait_for(mut step: impl FnMut() -> bool) {
    let deadline = Instant::now() + REPLY_TIMEOUT;
    while !step() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}
