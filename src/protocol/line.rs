//! Newline-delimited text framing.
//!
//! Every line on the wire is UTF-8 text terminated by exactly one `\n`.
//! [`sanitize`] guarantees that outgoing text cannot smuggle extra line
//! breaks into the stream, and [`LineReader`] turns incoming bytes back into
//! trimmed lines without tearing the channel down on a corrupt frame.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::ChatError;
use crate::status::ChannelRole;

/// Prepares text for the wire.
///
/// Carriage returns are removed, line feeds become a single space, the
/// result is trimmed and exactly one trailing newline is appended.
///
/// ```
/// assert_eq!(minechat::protocol::sanitize("hi\r\nthere\n"), "hi there\n");
/// assert_eq!(minechat::protocol::sanitize(""), "\n");
/// ```
pub fn sanitize(text: &str) -> String {
    let cleared = text.replace('\r', "").replace('\n', " ");
    format!("{}\n", cleared.trim())
}

/// Outcome of a single [`LineReader::read_line`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A complete line with terminators and surrounding whitespace removed.
    /// May be empty when the peer sent a blank line.
    Line(String),
    /// The line was not valid UTF-8 and has been dropped.
    Malformed,
    /// The peer closed the stream.
    Eof,
}

/// Buffered line reader over one half of a socket.
///
/// Partially received bytes are kept in the reader between calls, so a
/// `read_line` future may be dropped (by `select!` or `timeout`) without
/// losing data.
#[derive(Debug)]
pub struct LineReader<R> {
    role: ChannelRole,
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wraps a readable stream belonging to the given channel.
    pub fn new(role: ChannelRole, reader: R) -> Self {
        Self {
            role,
            inner: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Channel this reader belongs to.
    pub fn role(&self) -> ChannelRole {
        self.role
    }

    /// Waits for the next newline-terminated line.
    ///
    /// A final unterminated fragment before end-of-stream is still returned
    /// as a line; the following call reports [`ReadLine::Eof`].
    pub async fn read_line(&mut self) -> Result<ReadLine, ChatError> {
        let read = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|source| ChatError::ReadFailure {
                role: self.role,
                source,
            })?;

        if read == 0 && self.buf.is_empty() {
            return Ok(ReadLine::Eof);
        }

        let bytes = std::mem::take(&mut self.buf);
        match String::from_utf8(bytes) {
            Ok(text) => Ok(ReadLine::Line(text.replace('\r', "").trim().to_string())),
            Err(e) => {
                tracing::warn!(
                    role = %self.role,
                    "dropping line with invalid UTF-8 at byte {}",
                    e.utf8_error().valid_up_to()
                );
                Ok(ReadLine::Malformed)
            }
        }
    }
}

/// Line writer over one half of a socket.
#[derive(Debug)]
pub struct LineWriter<W> {
    role: ChannelRole,
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Wraps a writable stream belonging to the given channel.
    pub fn new(role: ChannelRole, writer: W) -> Self {
        Self {
            role,
            inner: writer,
        }
    }

    /// Sanitizes `text`, writes it as one line and flushes.
    pub async fn write_line(&mut self, text: &str) -> Result<(), ChatError> {
        let line = sanitize(text);
        self.inner
            .write_all(line.as_bytes())
            .await
            .map_err(|source| self.write_failure(source))?;
        self.inner
            .flush()
            .await
            .map_err(|source| self.write_failure(source))
    }

    /// Shuts down the write direction of the stream.
    pub async fn shutdown(&mut self) -> Result<(), ChatError> {
        self.inner
            .shutdown()
            .await
            .map_err(|source| self.write_failure(source))
    }

    fn write_failure(&self, source: std::io::Error) -> ChatError {
        ChatError::WriteFailure {
            role: self.role,
            source,
        }
    }
}
