//! Multiplex - run several child processes side by side and fan their output
//! out to per-process watchers.
//!
//! Architecture:
//! - [`Process`] owns one spawned child and its stdout/stderr pipes
//! - [`Observer`] waits for readiness across every live pipe at once, hands
//!   ready chunks to watchers, reaps exited children and respawns supervised
//!   ones
//! - [`MultiplexCommand`] describes what to run; [`CommandSpec`] is the plain
//!   data implementation, loadable from a project file via [`config`]
//!
//! ```rust,no_run
//! use multiplex::{Channel, CommandSpec, Observer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut observer = Observer::new();
//!     observer.listen(CommandSpec::new(["ping", "-c", "3", "localhost"]), |channel, chunk| {
//!         if channel == Channel::Stdout {
//!             print!("{}", String::from_utf8_lossy(chunk));
//!         }
//!     });
//!
//!     // Only returns on error.
//!     match observer.run().await? {}
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod observer;
pub mod process;

pub use command::{CommandSpec, EnvMode, MultiplexCommand};
pub use error::{Error, Result};
pub use observer::{Observer, RegistrationId, Watcher, READ_CHUNK_SIZE, WAIT_TIMEOUT};
pub use process::{Channel, ChannelHandle, Process};
