//! vendordash - manage marketplace packages, availability and bookings
//!
//! Reads are served from a local TTL cache when fresh; changes are applied
//! optimistically and invalidate the cached views they affect.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vendordash::cli::Cli;
use vendordash::commands;

fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=vendordash=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so clap sees its VENDORDASH_* values
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    debug!(command = ?cli.command, "Starting");

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
