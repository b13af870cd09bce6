//! Error types for the multiplexing core.

use thiserror::Error;

use crate::process::Channel;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while spawning, reading or supervising child processes.
#[derive(Debug, Error)]
pub enum Error {
    /// The command has no program to execute.
    #[error("command has an empty argument vector")]
    EmptyCommand,

    /// The operating system refused to create the child.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `create()` was called on a process that was already spawned.
    #[error("process has already been created")]
    AlreadyCreated,

    /// A lifecycle operation required a spawned process.
    #[error("process has not been created")]
    NotCreated,

    /// A channel was dispatched after its process released its handles.
    #[error("the {0} stream is terminated")]
    StreamTerminated(Channel),

    /// A channel name other than `stdout` or `stderr`.
    #[error("unknown watch event type: {0}")]
    UnknownChannel(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
