//! Multiplexed readiness wait across every live channel.

use std::collections::BTreeSet;
use std::future::poll_fn;
use std::task::Poll;
use std::time::Duration;

use tokio::time::timeout;
use tracing::trace;

use super::{RegistrationId, WorkingSet};
use crate::error::Result;
use crate::process::{Channel, ChannelHandle};

/// Registrations whose channels became readable, split by channel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ReadySet {
    pub stdout: BTreeSet<RegistrationId>,
    pub stderr: BTreeSet<RegistrationId>,
}

impl ReadySet {
    pub fn get(&self, channel: Channel) -> &BTreeSet<RegistrationId> {
        match channel {
            Channel::Stdout => &self.stdout,
            Channel::Stderr => &self.stderr,
        }
    }

    fn insert(&mut self, id: RegistrationId, channel: Channel) {
        match channel {
            Channel::Stdout => self.stdout.insert(id),
            Channel::Stderr => self.stderr.insert(id),
        };
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// Block until at least one live channel is readable, or `limit` elapses.
///
/// Every channel is polled on each wake-up, so the result contains all
/// channels ready at that moment, not just the first one.
pub(crate) async fn wait(working: &WorkingSet, limit: Duration) -> Result<ReadySet> {
    let watched: Vec<(RegistrationId, &ChannelHandle)> = working
        .iter()
        .flat_map(|(id, process)| {
            Channel::ALL
                .into_iter()
                .filter_map(move |channel| process.channel(channel).map(|handle| (*id, handle)))
        })
        .collect();

    let ready = poll_fn(|cx| {
        let mut ready = ReadySet::default();
        for (id, handle) in &watched {
            match handle.poll_read_ready(cx) {
                Poll::Ready(Ok(())) => ready.insert(*id, handle.kind()),
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => {}
            }
        }
        if ready.is_empty() {
            Poll::Pending
        } else {
            Poll::Ready(Ok(ready))
        }
    });

    match timeout(limit, ready).await {
        Ok(ready) => Ok(ready?),
        Err(_elapsed) => {
            trace!(channels = watched.len(), "readiness wait timed out");
            Ok(ReadySet::default())
        }
    }
}
