//! Lifecycle of a single spawned child.
//!
//! A [`Process`] is one-to-one with one OS spawn. It moves through
//! `Pending -> Live -> Terminated` exactly once; a terminated process is inert
//! and supervision replaces it with a fresh `Process` instead of reviving it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use chrono::{DateTime, Utc};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::channel::{Channel, ChannelHandle};
use super::status;
use crate::command::{EnvMode, MultiplexCommand};
use crate::error::{Error, Result};

/// Handles held while the child is live.
#[derive(Debug)]
struct LiveChild {
    child: Child,
    stdout: ChannelHandle,
    stderr: ChannelHandle,
}

#[derive(Debug)]
enum State {
    Pending,
    Live(Box<LiveChild>),
    Terminated,
}

/// A child process bound to the command it was created from.
#[derive(Debug)]
pub struct Process {
    argv: Vec<String>,
    env: HashMap<String, String>,
    env_mode: EnvMode,
    working_dir: Option<PathBuf>,

    pid: Option<u32>,
    run_at: Option<DateTime<Utc>>,
    exit_status: Option<ExitStatus>,
    state: State,
}

impl Process {
    /// Snapshot `command` into a new, not yet spawned process.
    pub fn for_command<C>(command: &C) -> Self
    where
        C: MultiplexCommand + ?Sized,
    {
        Self {
            argv: command.argv().to_vec(),
            env: command.environment().clone(),
            env_mode: command.env_mode(),
            working_dir: command.working_dir().map(PathBuf::from),
            pid: None,
            run_at: None,
            exit_status: None,
            state: State::Pending,
        }
    }

    /// Spawn the child with stdout and stderr captured as pipes.
    ///
    /// The child runs in the caller's current directory unless the command
    /// names one, and receives the command's environment according to its
    /// [`EnvMode`].
    ///
    /// # Errors
    ///
    /// Fails if the process was already created, if the argument vector is
    /// empty, or if the OS cannot create the child.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime with IO enabled.
    pub fn create(&mut self) -> Result<()> {
        if !matches!(self.state, State::Pending) {
            return Err(Error::AlreadyCreated);
        }
        let (program, args) = self.argv.split_first().ok_or(Error::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        if self.env_mode == EnvMode::Replace {
            cmd.env_clear();
        }
        cmd.envs(&self.env);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            program: program.clone(),
            source,
        })?;
        let run_at = Utc::now();
        let pid = child.id();

        let handles = child
            .stdout
            .take()
            .zip(child.stderr.take())
            .ok_or_else(|| std::io::Error::other("child stdio was not piped"))
            .and_then(|(out, err)| {
                Ok((
                    ChannelHandle::new(Channel::Stdout, out.into_owned_fd()?)?,
                    ChannelHandle::new(Channel::Stderr, err.into_owned_fd()?)?,
                ))
            });
        let (stdout, stderr) = match handles {
            Ok(handles) => handles,
            Err(err) => {
                release(&mut child, pid);
                return Err(err.into());
            }
        };

        debug!(pid = ?pid, program = %program, "spawned child");

        self.pid = pid;
        self.run_at = Some(run_at);
        self.state = State::Live(Box::new(LiveChild {
            child,
            stdout,
            stderr,
        }));
        Ok(())
    }

    /// OS process identifier, once created.
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// When the child was spawned, once created.
    pub const fn run_at(&self) -> Option<DateTime<Utc>> {
        self.run_at
    }

    /// Exit status, if it has been collected.
    pub const fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// The argument vector this process was created from.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Whether both channels and the OS handle are held.
    pub const fn is_live(&self) -> bool {
        matches!(self.state, State::Live(_))
    }

    /// Whether the OS still reports the child executing.
    ///
    /// Always false once terminated or before creation.
    pub fn is_running(&mut self) -> bool {
        let State::Live(ref mut live) = self.state else {
            return false;
        };
        match live.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.exit_status = Some(status);
                false
            }
            Err(err) => {
                warn!(pid = ?self.pid, error = %err, "failed to query child status");
                false
            }
        }
    }

    /// Whether the process is finished as far as multiplexing is concerned.
    ///
    /// True once [`terminate`](Self::terminate) ran, when either channel has
    /// reached end of stream, or when the OS reports the child stopped.
    /// Recomputed on every call.
    pub fn is_terminated(&self) -> bool {
        let live = match self.state {
            State::Pending => return false,
            State::Terminated => return true,
            State::Live(ref live) => live,
        };
        if live.stdout.is_eof() || live.stderr.is_eof() {
            return true;
        }
        let Some(pid) = self.pid else {
            return false;
        };
        status::is_stopped(pid).unwrap_or_else(|err| {
            warn!(pid, error = %err, "failed to query stopped state");
            false
        })
    }

    /// Release both channels and the OS handle. Idempotent.
    ///
    /// A child that has not exited yet is sent SIGKILL. The runtime reaps it
    /// in the background once it dies, so no zombie is left behind.
    pub fn terminate(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Terminated);
        let State::Live(live) = state else {
            // Nothing was spawned, or it was already released.
            return;
        };
        let LiveChild {
            mut child,
            stdout,
            stderr,
        } = *live;

        drop(stdout);
        drop(stderr);

        if let Some(status) = release(&mut child, self.pid) {
            self.exit_status = Some(status);
        }
        debug!(pid = ?self.pid, status = ?self.exit_status, "terminated child");
    }

    /// Readable handle for `channel`, only while live.
    pub fn channel(&self, channel: Channel) -> Option<&ChannelHandle> {
        match self.state {
            State::Live(ref live) => Some(match channel {
                Channel::Stdout => &live.stdout,
                Channel::Stderr => &live.stderr,
            }),
            _ => None,
        }
    }

    pub(crate) fn channel_mut(&mut self, channel: Channel) -> Option<&mut ChannelHandle> {
        match self.state {
            State::Live(ref mut live) => Some(match channel {
                Channel::Stdout => &mut live.stdout,
                Channel::Stderr => &mut live.stderr,
            }),
            _ => None,
        }
    }

    pub fn stdout(&self) -> Option<&ChannelHandle> {
        self.channel(Channel::Stdout)
    }

    pub fn stderr(&self) -> Option<&ChannelHandle> {
        self.channel(Channel::Stderr)
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Collect `child`'s exit status, or send it SIGKILL if it is still running.
///
/// Never blocks. A killed child is reaped by the runtime after the handle is
/// dropped.
fn release(child: &mut Child, pid: Option<u32>) -> Option<ExitStatus> {
    match child.try_wait() {
        Ok(Some(status)) => return Some(status),
        Ok(None) => {}
        Err(err) => warn!(pid = ?pid, error = %err, "failed to query child status"),
    }
    if let Err(err) = child.start_kill() {
        warn!(pid = ?pid, error = %err, "failed to kill child");
    }
    child.try_wait().ok().flatten()
}
