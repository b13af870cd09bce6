//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Multiplex - run several commands and interleave their output
#[derive(Parser, Debug)]
#[command(name = "multiplex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level for multiplex's own diagnostics (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the commands listed in a project file
    Run {
        /// Project file (TOML or JSON); defaults to multiplex.toml or multiplex.json
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,

        /// Only run these commands
        names: Vec<String>,
    },

    /// Run a single ad-hoc command
    Exec {
        /// Respawn the command whenever it exits
        #[arg(long)]
        supervise: bool,

        /// Pass the current environment through to the command
        #[arg(long)]
        inherit_env: bool,

        /// Label used to prefix the command's output
        #[arg(long)]
        name: Option<String>,

        /// Program and its arguments
        #[arg(trailing_var_arg = true, required = true, num_args = 1..)]
        argv: Vec<String>,
    },
}
