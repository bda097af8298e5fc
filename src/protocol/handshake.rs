//! Authentication and registration exchanges on the write channel.
//!
//! Both exchanges are fixed-shape and never negotiate. Any deviation from
//! the expected sequence is a hard failure rather than a partial state.
//!
//! ```text
//! authenticate                      register
//! S: greeting                       S: greeting
//! C: <token>                        C: (blank line)
//! S: {"nickname": ..} | null        S: nickname prompt
//!                                   C: <nickname>
//!                                   S: {"nickname": .., "account_hash": ..}
//! ```

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::ChatError;
use crate::protocol::line::{LineReader, LineWriter, ReadLine};
use crate::queues::LivenessSender;
use crate::session::watchdog::LivenessEvent;

/// Who the server says we are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name on the server.
    pub nickname: String,
    /// Token issued by a registration; `None` after authenticating with an
    /// existing token.
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountRecord {
    nickname: String,
}

#[derive(Debug, Deserialize)]
struct RegistrationRecord {
    account_hash: String,
}

/// Trims a user-supplied nickname, returning `None` when nothing is left.
///
/// Registration callers must run this before opening any connection.
pub fn validate_nickname(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Logs in with an existing account token.
///
/// Emits [`LivenessEvent::Greeting`] once the greeting arrives and
/// [`LivenessEvent::Authenticated`] on success.
pub async fn authenticate<R, W>(
    token: &str,
    reader: &mut LineReader<R>,
    writer: &mut LineWriter<W>,
    liveness: &LivenessSender,
) -> Result<Identity, ChatError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    read_response(reader).await?;
    let _ = liveness.send(LivenessEvent::Greeting);

    writer.write_line(token).await?;
    let response = read_response(reader).await?;

    let value: serde_json::Value = serde_json::from_str(&response)
        .map_err(|_| ChatError::protocol("could not parse the authentication response"))?;
    if value.is_null() {
        return Err(ChatError::InvalidToken);
    }
    let record: AccountRecord = serde_json::from_value(value)
        .map_err(|e| ChatError::protocol(format!("malformed account record: {e}")))?;

    let _ = liveness.send(LivenessEvent::Authenticated);
    Ok(Identity {
        nickname: record.nickname,
        token: None,
    })
}

/// Creates a new account under `nickname`.
///
/// The nickname is trimmed before sending; callers are expected to have
/// rejected blank nicknames with [`validate_nickname`] already.
pub async fn register<R, W>(
    nickname: &str,
    reader: &mut LineReader<R>,
    writer: &mut LineWriter<W>,
) -> Result<Identity, ChatError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let nickname = nickname.trim();

    read_response(reader).await?;
    writer.write_line("").await?;
    read_response(reader).await?;
    writer.write_line(nickname).await?;

    let response = match read_response(reader).await {
        Ok(line) => line,
        Err(ChatError::ChannelClosed { .. }) => String::new(),
        Err(e) => return Err(e),
    };
    if response.is_empty() {
        return Err(ChatError::protocol("empty registration response, try later"));
    }
    let record: RegistrationRecord = serde_json::from_str(&response)
        .map_err(|_| ChatError::protocol("unexpected registration response format"))?;

    Ok(Identity {
        nickname: nickname.to_string(),
        token: Some(record.account_hash),
    })
}

/// Reads one handshake line. A corrupt line reads as empty text so that it
/// fails parsing downstream; end-of-stream means the server hung up.
async fn read_response<R>(reader: &mut LineReader<R>) -> Result<String, ChatError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_line().await? {
        ReadLine::Line(line) => Ok(line),
        ReadLine::Malformed => Ok(String::new()),
        ReadLine::Eof => Err(ChatError::ChannelClosed {
            role: reader.role(),
        }),
    }
}
