//! Liveness monitoring.
//!
//! A half-open TCP connection produces neither errors nor EOF; it just goes
//! quiet. The watchdog is the only thing that notices: every worker reports
//! proof of life to the watchdog queue, and if nothing arrives within the
//! timeout the session is declared stale.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use crate::error::ChatError;
use crate::observe::{Observation, Observer};

/// Proof that the connection is alive. Only the fact of arrival matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// The server greeted us on the write channel.
    Greeting,
    /// The handshake completed.
    Authenticated,
    /// A chat line arrived on the read channel.
    MessageReceived,
    /// A user message was written to the write channel.
    MessageSent,
    /// The server echoed something on the write channel.
    HeartbeatEcho,
}

impl fmt::Display for LivenessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LivenessEvent::Greeting => "Greetings before authentication",
            LivenessEvent::Authenticated => "Authenticated",
            LivenessEvent::MessageReceived => "New message in chat",
            LivenessEvent::MessageSent => "Message has been sent",
            LivenessEvent::HeartbeatEcho => "Healthcheck message",
        };
        write!(f, "{}", s)
    }
}

/// Waits on the watchdog queue until it stays silent for `stale_after`.
///
/// Returns [`ChatError::ConnectionStale`] on timeout. Returns `Ok(())` only
/// if every producer has gone away, which the supervisor treats like any
/// other worker exit.
pub async fn watch(
    events: &mut UnboundedReceiver<LivenessEvent>,
    stale_after: Duration,
    observer: &Arc<dyn Observer>,
) -> Result<(), ChatError> {
    loop {
        match timeout(stale_after, events.recv()).await {
            Ok(Some(event)) => observer.record(&Observation::Liveness(event)),
            Ok(None) => return Ok(()),
            Err(_) => {
                observer.record(&Observation::WatchdogExpired {
                    timeout: stale_after,
                });
                return Err(ChatError::ConnectionStale {
                    timeout: stale_after,
                });
            }
        }
    }
}

/// Discards events queued by a previous session so they cannot vouch for
/// a connection that does not exist yet.
pub fn drain_stale(events: &mut UnboundedReceiver<LivenessEvent>) -> usize {
    let mut drained = 0;
    while events.try_recv().is_ok() {
        drained += 1;
    }
    drained
}
