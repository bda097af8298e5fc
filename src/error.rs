//! Error taxonomy for the chat client.
//!
//! Errors split into two classes. Connection-class errors describe transport
//! state (refused connects, stalls, peers hanging up) and are absorbed by the
//! reconnect loop. Everything else is fatal: retrying with the same token or
//! against a server that speaks a different protocol cannot succeed.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::status::ChannelRole;

/// Errors produced by the line channel, handshake, session workers and the
/// history collaborator.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Name resolution, refusal or connect timeout. Callers never need to
    /// tell these apart, so they all collapse into this one variant.
    #[error("cannot connect to {host}:{port}")]
    ConnectFailure {
        /// Host that was dialed.
        host: String,
        /// Port that was dialed.
        port: u16,
        /// Underlying I/O error (`TimedOut` for connect timeouts).
        #[source]
        source: std::io::Error,
    },

    /// The watchdog saw no liveness signal within its timeout.
    #[error("connection stale: no activity for {}", humantime::format_duration(*timeout))]
    ConnectionStale {
        /// Watchdog timeout that elapsed.
        timeout: Duration,
    },

    /// Writing a line failed, usually because the peer has closed.
    #[error("failed to write to {role} channel")]
    WriteFailure {
        /// Channel the write was attempted on.
        role: ChannelRole,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading from the socket failed at the transport level.
    #[error("failed to read from {role} channel")]
    ReadFailure {
        /// Channel the read was attempted on.
        role: ChannelRole,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the stream or a worker on this channel stopped.
    #[error("{role} channel closed")]
    ChannelClosed {
        /// Channel that ended.
        role: ChannelRole,
    },

    /// The server does not know the supplied token.
    #[error("invalid token: the server did not recognise it, check your credentials")]
    InvalidToken,

    /// The server answered the handshake with something unexpected.
    #[error("server returned an unexpected response: {message}")]
    ProtocolError {
        /// What was wrong with the response.
        message: String,
    },

    /// A local file needed by a collaborator could not be opened or written.
    #[error("cannot open {path} for writing")]
    LocalResourceFailure {
        /// File that could not be used.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ChatError {
    /// Builds a [`ChatError::ProtocolError`] from any message.
    pub fn protocol(message: impl Into<String>) -> Self {
        ChatError::ProtocolError {
            message: message.into(),
        }
    }

    /// Returns `true` for failures attributable to the network that the
    /// reconnect loop should retry.
    pub fn is_connection_class(&self) -> bool {
        matches!(
            self,
            ChatError::ConnectFailure { .. }
                | ChatError::ConnectionStale { .. }
                | ChatError::WriteFailure { .. }
                | ChatError::ReadFailure { .. }
                | ChatError::ChannelClosed { .. }
        )
    }

    /// Short heading used when a fatal error is reported to the user.
    pub fn title(&self) -> &'static str {
        match self {
            ChatError::InvalidToken => "Invalid token",
            ChatError::ProtocolError { .. } => "Unexpected server response",
            ChatError::LocalResourceFailure { .. } => "Cannot open file",
            _ => "Connection problem",
        }
    }
}
