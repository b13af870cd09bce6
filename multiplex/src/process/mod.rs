//! Child process lifecycle and its readable channels.
//!
//! This module owns everything that touches the OS for a single child:
//! spawning with piped stdout/stderr, non-blocking channel handles, status
//! queries, and synchronous idempotent teardown.

mod channel;
mod lifecycle;
mod status;

pub use channel::{Channel, ChannelHandle, ReadOutcome};
pub use lifecycle::Process;
