//! Multiplex - run several commands side by side with prefixed output.
//!
//! Architecture:
//! - The library crate owns the process lifecycle and the readiness loop
//! - This binary parses the CLI, loads a project file and prints each
//!   command's output line by line, prefixed with its name
//! - Diagnostics go through `tracing` to stderr

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    execute(cli).await
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
