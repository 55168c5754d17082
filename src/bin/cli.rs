//! emberkv Shell Binary
//!
//! Opens an engine on a data directory and runs the interactive shell on
//! stdin/stdout. Logs go to stderr.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use emberkv::shell::Repl;
use emberkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// emberkv shell
#[derive(Parser, Debug)]
#[command(name = "emberkv")]
#[command(about = "Embedded log-structured key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, env = "EMBERKV_DATA_DIR", default_value = "./emberkv_data")]
    data_dir: PathBuf,

    /// Record header size in bytes (fixed for the life of a log file)
    #[arg(long, env = "EMBERKV_HEADER_SIZE", default_value = "21")]
    header_size: u32,

    /// Flush the write buffer once it holds this many bytes
    #[arg(short, long, env = "EMBERKV_BATCH_SIZE", default_value = "4096")]
    batch_size: usize,

    /// Flush the write buffer at least this often (seconds)
    #[arg(short, long, env = "EMBERKV_SYNC_INTERVAL", default_value = "5")]
    sync_interval: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,emberkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("emberkv v{}", emberkv::VERSION);

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .header_size(args.header_size)
        .batch_size(args.batch_size)
        .sync_interval_secs(args.sync_interval)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = Repl::new(&engine, stdin.lock(), stdout.lock()).run();

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = result {
        tracing::error!("Shell error: {}", e);
        std::process::exit(1);
    }
}
