//! Readable byte channels of a child process.
//!
//! Each channel owns the read end of a child's pipe as a tokio
//! [`pipe::Receiver`], so that many channels can be waited on at once and
//! then read without blocking.

use std::io;
use std::os::fd::OwnedFd;
use std::str::FromStr;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::net::unix::pipe;

use crate::error::Error;

/// Which output stream of a child a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl Channel {
    /// Both channels, in dispatch order.
    pub const ALL: [Self; 2] = [Self::Stdout, Self::Stderr];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "STDOUT",
            Self::Stderr => "STDERR",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            _ => Err(Error::UnknownChannel(s.to_owned())),
        }
    }
}

/// Outcome of a single read attempt on a ready channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were read into the buffer. Zero means end of stream.
    Data(usize),
    /// The readiness was stale; nothing to deliver.
    Spurious,
}

/// A non-blocking, reactor-registered pipe owned by a [`Process`](super::Process).
#[derive(Debug)]
pub struct ChannelHandle {
    kind: Channel,
    pipe: pipe::Receiver,
    eof: bool,
}

impl ChannelHandle {
    /// Take ownership of a pipe's read end and register it with the current
    /// runtime. The descriptor is switched to non-blocking mode.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime with IO enabled.
    pub(crate) fn new(kind: Channel, fd: OwnedFd) -> io::Result<Self> {
        Ok(Self {
            kind,
            pipe: pipe::Receiver::from_owned_fd(fd)?,
            eof: false,
        })
    }

    pub const fn kind(&self) -> Channel {
        self.kind
    }

    /// Whether a read on this channel has already hit end of stream.
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// Register interest in read readiness; `Ready` once data or EOF is pending.
    pub(crate) fn poll_read_ready(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.pipe.poll_read_ready(cx)
    }

    /// Read at most `buf.len()` bytes.
    ///
    /// Only call this after the channel was reported ready; a stale readiness
    /// is cleared and reported as [`ReadOutcome::Spurious`].
    pub(crate) async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        loop {
            self.pipe.readable().await?;
            match self.pipe.try_read(buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(ReadOutcome::Data(0));
                }
                Ok(n) => return Ok(ReadOutcome::Data(n)),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                // try_read already cleared the stale readiness.
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::Spurious);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
