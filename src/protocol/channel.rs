//! A single TCP connection speaking the line protocol.

use std::fmt;
use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::ChatError;
use crate::protocol::line::{LineReader, LineWriter, ReadLine};
use crate::queues::StatusSender;
use crate::status::{ChannelRole, ConnectionState, StatusEvent};

/// Host and port of one chat server channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lifecycle phase of a [`LineChannel`].
///
/// A constructed channel is always `Connected` or `Closed`; the earlier
/// phases only exist while [`LineChannel::open`] is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// No connect attempt yet.
    NotConnected,
    /// Connect in progress.
    Connecting,
    /// Socket is open.
    Connected,
    /// Socket has been released.
    Closed,
}

/// An open line-protocol connection owned by one session.
///
/// Opening reports `initiated` and `established` to the status queue.
/// Closing always reports `closed` followed by `identity unknown`, exactly
/// once, whether the channel is closed explicitly with [`LineChannel::close`]
/// or simply dropped because the owning session was cancelled.
#[derive(Debug)]
pub struct LineChannel {
    endpoint: Endpoint,
    role: ChannelRole,
    phase: ChannelPhase,
    reader: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
    status: StatusSender,
}

impl LineChannel {
    /// Connects to `endpoint`, giving up after `connect_timeout`.
    ///
    /// Timeouts, refusals and resolution failures all surface as
    /// [`ChatError::ConnectFailure`]. A failed attempt still reports
    /// `closed` so observers never see a dangling `initiated`.
    pub async fn open(
        endpoint: &Endpoint,
        role: ChannelRole,
        connect_timeout: Duration,
        status: StatusSender,
    ) -> Result<Self, ChatError> {
        tracing::debug!(%role, %endpoint, "opening channel");
        emit(&status, StatusEvent::connection(role, ConnectionState::Initiated));

        let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        let result = match tokio::time::timeout(connect_timeout, connect).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!(
                    "connect timed out after {}",
                    humantime::format_duration(connect_timeout)
                ),
            )),
        };

        let stream = match result {
            Ok(stream) => stream,
            Err(source) => {
                tracing::debug!(%role, %endpoint, "connect failed: {}", source);
                emit_closed(&status, role);
                return Err(ChatError::ConnectFailure {
                    host: endpoint.host.clone(),
                    port: endpoint.port,
                    source,
                });
            }
        };

        let (read_half, write_half) = stream.into_split();
        emit(&status, StatusEvent::connection(role, ConnectionState::Established));
        tracing::debug!(%role, %endpoint, "channel established");

        Ok(Self {
            endpoint: endpoint.clone(),
            role,
            phase: ChannelPhase::Connected,
            reader: LineReader::new(role, read_half),
            writer: LineWriter::new(role, write_half),
            status,
        })
    }

    /// Which channel this is.
    pub fn role(&self) -> ChannelRole {
        self.role
    }

    /// Where this channel is connected.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    /// Reads one line; see [`LineReader::read_line`].
    pub async fn read_line(&mut self) -> Result<ReadLine, ChatError> {
        self.reader.read_line().await
    }

    /// Writes one sanitized line; see [`LineWriter::write_line`].
    pub async fn write_line(&mut self, text: &str) -> Result<(), ChatError> {
        self.writer.write_line(text).await
    }

    /// Borrows the read and write halves separately so they can be driven
    /// by concurrent loops.
    pub fn halves(
        &mut self,
    ) -> (
        &mut LineReader<OwnedReadHalf>,
        &mut LineWriter<OwnedWriteHalf>,
    ) {
        (&mut self.reader, &mut self.writer)
    }

    /// Shuts the socket down and reports `closed` + `identity unknown`.
    pub async fn close(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!(role = %self.role, "shutdown failed: {}", e);
        }
        self.mark_closed();
    }

    fn mark_closed(&mut self) {
        if self.phase == ChannelPhase::Closed {
            return;
        }
        self.phase = ChannelPhase::Closed;
        tracing::debug!(role = %self.role, endpoint = %self.endpoint, "channel closed");
        emit_closed(&self.status, self.role);
    }
}

impl Drop for LineChannel {
    fn drop(&mut self) {
        self.mark_closed();
    }
}

fn emit(status: &StatusSender, event: StatusEvent) {
    // A missing presentation layer is not a reason to fail the connection.
    let _ = status.send(event);
}

fn emit_closed(status: &StatusSender, role: ChannelRole) {
    emit(status, StatusEvent::connection(role, ConnectionState::Closed));
    emit(status, StatusEvent::IdentityUnknown);
}
