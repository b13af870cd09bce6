//! The multiplexing loop.
//!
//! An [`Observer`] holds `(command, watcher)` registrations. [`Observer::run`]
//! spawns one [`Process`] per registration and then loops forever:
//!
//! 1. reap processes that terminated, respawning supervised ones in place;
//! 2. wait (at most [`WAIT_TIMEOUT`]) until any live channel is readable;
//! 3. dispatch every ready stdout channel, then every ready stderr channel,
//!    each in registration order, reading at most [`READ_CHUNK_SIZE`] bytes
//!    and handing them to the registration's watcher.
//!
//! The loop runs inside a single future. Dropping that future drops the
//! working set, and every process is terminated on drop.

mod readiness;
mod watcher;

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::command::MultiplexCommand;
use crate::error::{Error, Result};
use crate::process::{Channel, Process, ReadOutcome};

use readiness::ReadySet;
pub use watcher::Watcher;

/// Upper bound on a single readiness wait.
pub const WAIT_TIMEOUT: Duration = Duration::from_millis(200);

/// Maximum bytes read from a channel per dispatch.
pub const READ_CHUNK_SIZE: usize = 8192;

/// Stable identifier of a registration, ordered by registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live processes keyed by the registration they belong to.
pub(crate) type WorkingSet = BTreeMap<RegistrationId, Process>;

struct Listener {
    command: Arc<dyn MultiplexCommand>,
    watcher: Box<dyn Watcher>,
    respawns: u64,
}

/// Runs registered commands and fans their output out to watchers.
#[derive(Default)]
pub struct Observer {
    listeners: BTreeMap<RegistrationId, Listener>,
    next_id: u64,
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command` with a closure watcher.
    pub fn listen<C, F>(&mut self, command: C, watcher: F) -> &mut Self
    where
        C: MultiplexCommand + 'static,
        F: FnMut(Channel, &[u8]) + Send + 'static,
    {
        self.listen_with(Arc::new(command), watcher)
    }

    /// Register a shared command with any [`Watcher`].
    pub fn listen_with<W>(
        &mut self,
        command: Arc<dyn MultiplexCommand>,
        watcher: W,
    ) -> &mut Self
    where
        W: Watcher + 'static,
    {
        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(
            id,
            Listener {
                command,
                watcher: Box::new(watcher),
                respawns: 0,
            },
        );
        self
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Registration ids, in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = RegistrationId> + '_ {
        self.listeners.keys().copied()
    }

    /// Spawn every registration and multiplex their output until an error.
    ///
    /// There is no exit condition: the returned future only completes with
    /// an error. Drop it (for example through `tokio::select!` or
    /// `tokio::time::timeout`) to stop, which terminates every child.
    ///
    /// # Errors
    ///
    /// Fails on spawn errors (initial or respawn), IO errors from the wait or
    /// a read, and [`Error::StreamTerminated`] if a channel is dispatched after
    /// its process released its handles.
    pub async fn run(&mut self) -> Result<Infallible> {
        let mut working = self.spawn_all()?;
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            self.iterate(&mut working, &mut buf).await?;
        }
    }

    /// One pass: reap, wait, dispatch.
    pub(crate) async fn iterate(
        &mut self,
        working: &mut WorkingSet,
        buf: &mut [u8],
    ) -> Result<()> {
        self.reap(working)?;
        let ready = readiness::wait(working, WAIT_TIMEOUT).await?;
        self.dispatch(working, &ready, buf).await
    }

    pub(crate) fn spawn_all(&self) -> Result<WorkingSet> {
        let mut working = WorkingSet::new();
        for (id, listener) in &self.listeners {
            let mut process = listener.command.new_process();
            process.create()?;
            info!(registration = %id, pid = ?process.pid(), argv = ?process.argv(), "spawned");
            working.insert(*id, process);
        }
        Ok(working)
    }

    /// Remove terminated processes; supervised registrations get a new process
    /// under the same id.
    fn reap(&mut self, working: &mut WorkingSet) -> Result<()> {
        let terminated: Vec<RegistrationId> = working
            .iter()
            .filter(|(_, process)| process.is_terminated())
            .map(|(id, _)| *id)
            .collect();

        for id in terminated {
            let Some(mut process) = working.remove(&id) else {
                continue;
            };
            process.terminate();
            debug!(registration = %id, pid = ?process.pid(), status = ?process.exit_status(), "reaped");

            let Some(listener) = self.listeners.get_mut(&id) else {
                continue;
            };
            if !listener.command.supervision_enabled() {
                info!(registration = %id, pid = ?process.pid(), "process exited, registration dropped");
                continue;
            }

            let mut replacement = listener.command.new_process();
            replacement.create()?;
            listener.respawns += 1;
            info!(
                registration = %id,
                old_pid = ?process.pid(),
                pid = ?replacement.pid(),
                respawns = listener.respawns,
                "respawned"
            );
            working.insert(id, replacement);
        }
        Ok(())
    }

    /// Read every ready channel once: all stdout first, then all stderr.
    async fn dispatch(
        &mut self,
        working: &mut WorkingSet,
        ready: &ReadySet,
        buf: &mut [u8],
    ) -> Result<()> {
        for channel in Channel::ALL {
            for id in ready.get(channel) {
                let Some(process) = working.get_mut(id) else {
                    return Err(Error::StreamTerminated(channel));
                };
                let handle = process
                    .channel_mut(channel)
                    .ok_or(Error::StreamTerminated(channel))?;

                let n = match handle.read_chunk(buf).await? {
                    ReadOutcome::Data(n) => n,
                    ReadOutcome::Spurious => continue,
                };

                if let Some(listener) = self.listeners.get_mut(id) {
                    listener.watcher.on_chunk(channel, &buf[..n]);
                }
            }
        }
        Ok(())
    }
}
