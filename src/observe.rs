//! Observability sink threaded through the connection core.
//!
//! The core never logs session-level milestones through ambient globals; it
//! reports them to an [`Observer`] handed in at construction. The default
//! [`TracingObserver`] turns them into `tracing` events.

use std::time::Duration;

use crate::session::watchdog::LivenessEvent;
use crate::session::SessionPhase;

/// Something worth recording about the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The watchdog accepted a liveness event.
    Liveness(LivenessEvent),
    /// The watchdog timed out.
    WatchdogExpired {
        /// Timeout that elapsed without activity.
        timeout: Duration,
    },
    /// The supervisor moved to a new phase.
    PhaseChanged(SessionPhase),
    /// Handshake succeeded.
    Authenticated {
        /// Nickname the server reported.
        nickname: String,
    },
    /// A connection-class failure ended a session; a retry is scheduled.
    Reconnecting {
        /// One-based number of the session that just failed.
        attempt: u64,
        /// Delay before the next attempt.
        delay: Duration,
        /// Rendered failure.
        reason: String,
    },
}

/// Receiver of [`Observation`]s.
pub trait Observer: Send + Sync {
    /// Records one observation. Must not block.
    fn record(&self, observation: &Observation);
}

/// Observer that forwards everything to `tracing`.
///
/// Watchdog activity goes to the `watchdog` target so it can be filtered
/// separately, e.g. `MINECHAT_LOG=info,watchdog=warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn record(&self, observation: &Observation) {
        match observation {
            Observation::Liveness(event) => {
                tracing::debug!(target: "watchdog", "{}", event);
            }
            Observation::WatchdogExpired { timeout } => {
                tracing::info!(
                    target: "watchdog",
                    "{} timeout is elapsed",
                    humantime::format_duration(*timeout)
                );
            }
            Observation::PhaseChanged(phase) => {
                tracing::debug!(?phase, "session phase changed");
            }
            Observation::Authenticated { nickname } => {
                tracing::info!("Authenticated as {}", nickname);
            }
            Observation::Reconnecting {
                attempt,
                delay,
                reason,
            } => {
                tracing::info!(
                    attempt,
                    "Connection error ({}), reconnect in {}",
                    reason,
                    humantime::format_duration(*delay)
                );
            }
        }
    }
}
