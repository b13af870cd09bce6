//! Callbacks that receive output chunks.

use crate::process::Channel;

/// Receives chunks read from a registration's channels.
///
/// Called synchronously from the observer loop; a slow watcher delays every
/// other registration. The chunk is only borrowed for the duration of the
/// call.
pub trait Watcher: Send {
    fn on_chunk(&mut self, channel: Channel, chunk: &[u8]);
}

impl<F> Watcher for F
where
    F: FnMut(Channel, &[u8]) + Send,
{
    fn on_chunk(&mut self, channel: Channel, chunk: &[u8]) {
        self(channel, chunk);
    }
}
