//! r-VEX platform simulator CLI.
//!
//! This binary builds the simulated platform and runs it until a debug client sends
//! `Stop`. It performs:
//! 1. **Configuration:** Loads a JSON config file (optional) and applies command-line
//!    overrides on top of it.
//! 2. **Preloading:** Writes memory images given as `FILE@ADDR` before the run.
//! 3. **Run:** Opens the debug server, simulates, and prints a summary on exit.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rvex_sim::{Config, PlatformBuilder, SimError};

#[derive(Parser, Debug)]
#[command(
    name = "rvsim",
    author,
    version,
    about = "r-VEX cycle-accurate platform simulator",
    long_about = "Simulates the r-VEX platform bus, memory and debug port, and serves the rvsrv \
                  debug protocol over TCP so rvd and other host tools can connect.\n\n\
                  Examples:\n  rvsim\n  rvsim --port 21079 --latency 4 --period 1\n  \
                  rvsim --config platform.json --load program.bin@0x0"
)]
struct Cli {
    /// JSON configuration file; command-line options override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TCP port of the debug server (0 picks a free port).
    #[arg(short, long)]
    port: Option<u16>,

    /// Log2 of the memory size in bytes.
    #[arg(long)]
    mem_bits: Option<u32>,

    /// Read and write latency of the memory in cycles.
    #[arg(long)]
    latency: Option<u32>,

    /// Read and write burst period of the memory in cycles.
    #[arg(long)]
    period: Option<u32>,

    /// Memory image to preload, as FILE@ADDR (ADDR in hex, 0x prefix optional).
    #[arg(short, long, value_parser = parse_image)]
    load: Vec<Image>,

    /// Stop after this many cycles even without a Stop command.
    #[arg(long)]
    max_cycles: Option<u64>,
}

/// A memory image given on the command line.
#[derive(Clone, Debug)]
struct Image {
    path: PathBuf,
    address: u32,
}

fn parse_image(arg: &str) -> Result<Image, String> {
    let (path, address) = arg
        .rsplit_once('@')
        .ok_or_else(|| format!("expected FILE@ADDR, got '{arg}'"))?;
    let digits = address.trim_start_matches("0x").trim_start_matches("0X");
    let address = u32::from_str_radix(digits, 16).map_err(|e| format!("bad address '{address}': {e}"))?;
    Ok(Image {
        path: PathBuf::from(path),
        address,
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), SimError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.debug.port = port;
    }
    if let Some(bits) = cli.mem_bits {
        config.memory.address_bits = bits;
    }
    if let Some(latency) = cli.latency {
        config.memory.read_latency = latency;
        config.memory.write_latency = latency;
    }
    if let Some(period) = cli.period {
        config.memory.read_period = period;
        config.memory.write_period = period;
    }

    let mut builder = PlatformBuilder::new(config);
    for image in &cli.load {
        builder = builder.load_file(image.address, &image.path)?;
    }
    let mut platform = builder.build()?;
    info!("debug server ready at {}", platform.debug_addr());

    let stats = match cli.max_cycles {
        Some(max) => platform.run_cycles(max)?,
        None => platform.run()?,
    };
    stats.print();
    Ok(())
}
