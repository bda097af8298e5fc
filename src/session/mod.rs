//! Connection supervision: one session at a time, reconnecting forever.
//!
//! A session opens the read and write channels, authenticates on the write
//! channel under the watchdog and then runs three workers together:
//!
//! - the read worker ([`workers::read_messages`]),
//! - the write worker ([`workers::write_worker`]: messages, pings, echoes),
//! - the watchdog ([`watchdog::watch`]).
//!
//! The first worker to finish, successfully or not, ends the session. The
//! other two are dropped at their next await point and both channels are
//! closed. [`reconnect::run_forever`] then decides whether to try again.
//! The only clean ending is the write worker finding the send queue closed
//! and empty, which means every typed message has gone out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ChatError;
use crate::observe::{Observation, Observer};
use crate::protocol::{authenticate, Endpoint, LineChannel};
use crate::queues::CoreQueues;
use crate::status::{ChannelRole, StatusEvent};

/// Reconnect loop.
pub mod reconnect;

/// Liveness events and the watchdog.
pub mod watchdog;

/// Read and write worker loops.
pub mod workers;

/// Default bound on a single TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default silence after which a session is considered dead.
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(2);

/// Default pause between a failed session and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Default interval between keep-alive pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a session needs to know about the server and its timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Broadcast (receive-only) channel.
    pub read_endpoint: Endpoint,
    /// Authentication and sending channel.
    pub write_endpoint: Endpoint,
    /// Account token sent during the handshake.
    pub token: String,
    /// Bound on each TCP connect.
    pub connect_timeout: Duration,
    /// Silence tolerated before the watchdog fails the session.
    pub watchdog_timeout: Duration,
    /// Pause between sessions after a connection-class failure.
    pub reconnect_delay: Duration,
    /// Interval between keep-alive pings on the write channel.
    pub heartbeat_interval: Duration,
}

impl ConnectionSettings {
    /// Creates settings with default timings.
    pub fn new(read_endpoint: Endpoint, write_endpoint: Endpoint, token: impl Into<String>) -> Self {
        Self {
            read_endpoint,
            write_endpoint,
            token: token.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Where the supervisor is within the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Between sessions.
    Idle,
    /// Opening the read and write channels.
    Connecting,
    /// Running the token handshake.
    Authenticating,
    /// Workers are running.
    Active,
    /// Tearing both channels down.
    Closing,
}

/// Something that can run one full session.
///
/// The reconnect loop only depends on this trait, so it can be driven by
/// scripted sessions in tests.
#[async_trait]
pub trait SessionRunner: Send {
    /// Runs a session to completion and reports why it ended.
    async fn run_session(&mut self) -> Result<(), ChatError>;
}

/// Owns the queues across reconnects and runs one TCP session at a time.
pub struct ConnectionSupervisor {
    settings: ConnectionSettings,
    queues: CoreQueues,
    observer: Arc<dyn Observer>,
    phase: SessionPhase,
}

impl ConnectionSupervisor {
    /// Creates an idle supervisor.
    pub fn new(settings: ConnectionSettings, queues: CoreQueues, observer: Arc<dyn Observer>) -> Self {
        Self {
            settings,
            queues,
            observer,
            phase: SessionPhase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Settings this supervisor connects with.
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Runs sessions until a fatal error; see [`reconnect::run_forever`].
    pub async fn run(&mut self) -> Result<(), ChatError> {
        let delay = self.settings.reconnect_delay;
        let observer = Arc::clone(&self.observer);
        reconnect::run_forever(self, delay, &observer).await
    }

    /// Runs one session: connect, authenticate, run workers, close.
    ///
    /// Both channels are closed on every exit path. The returned error is
    /// whatever ended the session; a read worker that simply stops is
    /// reported as [`ChatError::ChannelClosed`]. `Ok(())` means the send
    /// queue was closed and every queued message was written.
    pub async fn session(&mut self) -> Result<(), ChatError> {
        let stale = watchdog::drain_stale(&mut self.queues.liveness_events);
        if stale > 0 {
            tracing::debug!("discarded {} liveness events from previous session", stale);
        }

        self.set_phase(SessionPhase::Connecting);
        let connect_timeout = self.settings.connect_timeout;
        let status = self.queues.status.clone();

        let mut read = match LineChannel::open(
            &self.settings.read_endpoint,
            ChannelRole::Read,
            connect_timeout,
            status.clone(),
        )
        .await
        {
            Ok(channel) => channel,
            Err(e) => {
                self.set_phase(SessionPhase::Idle);
                return Err(e);
            }
        };
        let mut write = match LineChannel::open(
            &self.settings.write_endpoint,
            ChannelRole::Write,
            connect_timeout,
            status,
        )
        .await
        {
            Ok(channel) => channel,
            Err(e) => {
                self.set_phase(SessionPhase::Closing);
                read.close().await;
                self.set_phase(SessionPhase::Idle);
                return Err(e);
            }
        };

        let result = self.authenticate_and_run(&mut read, &mut write).await;

        self.set_phase(SessionPhase::Closing);
        write.close().await;
        read.close().await;
        self.set_phase(SessionPhase::Idle);

        match &result {
            Err(e) if e.is_connection_class() => tracing::warn!("session ended: {}", e),
            Err(e) => tracing::error!("session failed: {}", e),
            Ok(()) => tracing::info!("session ended"),
        }
        result
    }

    async fn authenticate_and_run(
        &mut self,
        read: &mut LineChannel,
        write: &mut LineChannel,
    ) -> Result<(), ChatError> {
        self.set_phase(SessionPhase::Authenticating);
        let stale_after = self.settings.watchdog_timeout;
        let (echo_reader, writer) = write.halves();
        let identity = {
            let CoreQueues {
                liveness,
                liveness_events,
                ..
            } = &mut self.queues;
            // A peer that accepts and then stays silent must not stall the
            // handshake forever.
            tokio::select! {
                result = authenticate(&self.settings.token, echo_reader, writer, liveness) => result?,
                result = watchdog::watch(liveness_events, stale_after, &self.observer) => {
                    return result.and(Err(ChatError::ConnectionStale { timeout: stale_after }));
                }
            }
        };

        self.observer.record(&Observation::Authenticated {
            nickname: identity.nickname.clone(),
        });
        let _ = self
            .queues
            .status
            .send(StatusEvent::NicknameReceived(identity.nickname));

        self.set_phase(SessionPhase::Active);
        let heartbeat = self.settings.heartbeat_interval;
        let (chat_reader, _) = read.halves();
        let CoreQueues {
            messages,
            history,
            outgoing,
            liveness,
            liveness_events,
            ..
        } = &mut self.queues;
        let observer = &self.observer;

        tokio::select! {
            result = workers::read_messages(chat_reader, messages, history, liveness) => {
                result.and(Err(ChatError::ChannelClosed { role: ChannelRole::Read }))
            }
            result = workers::write_worker(
                echo_reader,
                writer,
                outgoing,
                liveness,
                heartbeat,
                stale_after,
            ) => {
                if result.is_ok() {
                    tracing::info!("send queue closed and drained");
                }
                result
            }
            result = watchdog::watch(liveness_events, stale_after, observer) => {
                result.and(Err(ChatError::ConnectionStale { timeout: stale_after }))
            }
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.observer.record(&Observation::PhaseChanged(phase));
        }
    }
}

#[async_trait]
impl SessionRunner for ConnectionSupervisor {
    async fn run_session(&mut self) -> Result<(), ChatError> {
        self.session().await
    }
}
