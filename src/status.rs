//! Connection status events published to the presentation layer.

use std::fmt;

/// Which of the two TCP channels an event or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Receive-only channel carrying broadcast chat text.
    Read,
    /// Channel used to authenticate and send messages.
    Write,
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelRole::Read => "read",
            ChannelRole::Write => "write",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle of a single line channel as seen by the status observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connect attempt has started.
    Initiated,
    /// The TCP connection is up.
    Established,
    /// The socket is gone (closed by us, by the peer, or never opened).
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Initiated => "connecting",
            ConnectionState::Established => "connected",
            ConnectionState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Event on the status queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A channel moved to a new lifecycle state.
    Connection {
        /// Channel the change applies to.
        role: ChannelRole,
        /// New state.
        state: ConnectionState,
    },
    /// Authentication succeeded under this nickname.
    NicknameReceived(String),
    /// Any previously reported nickname is no longer valid.
    IdentityUnknown,
}

impl StatusEvent {
    /// Shorthand for a [`StatusEvent::Connection`] event.
    pub fn connection(role: ChannelRole, state: ConnectionState) -> Self {
        StatusEvent::Connection { role, state }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Connection { role, state } => write!(f, "[{}] {}", role, state),
            StatusEvent::NicknameReceived(nickname) => write!(f, "logged in as {}", nickname),
            StatusEvent::IdentityUnknown => write!(f, "nickname unknown"),
        }
    }
}
