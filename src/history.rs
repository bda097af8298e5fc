//! Chat history persistence.
//!
//! Every received message is appended to a plain text file, one message per
//! line. On start the file is replayed into the message queue so the user
//! sees the conversation so far before the first live message arrives.

use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::config::xdg;
use crate::error::ChatError;

/// Pushes every line of the history file into `messages`, in file order.
///
/// A missing or unreadable file is not an error; there is simply nothing
/// to restore. Returns the number of restored lines.
pub async fn restore(path: &Path, messages: &UnboundedSender<String>) -> usize {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("no history restored from {}: {}", path.display(), e);
            return 0;
        }
    };

    let mut lines = BufReader::new(file).lines();
    let mut restored = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let _ = messages.send(line.trim_end().to_string());
                restored += 1;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("history restore stopped early: {}", e);
                break;
            }
        }
    }
    tracing::debug!(restored, "history restored from {}", path.display());
    restored
}

/// Appends each line received on `history` to the file at `path`.
///
/// The file is opened once, in append mode, creating it and its parent
/// directory if needed. Each line is flushed as soon as it is written.
/// Returns `Ok(())` once every history producer has gone away.
pub async fn save(path: &Path, history: &mut UnboundedReceiver<String>) -> Result<(), ChatError> {
    let local_failure = |source| ChatError::LocalResourceFailure {
        path: path.to_path_buf(),
        source,
    };

    xdg::ensure_parent(path).map_err(local_failure)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(local_failure)?;

    while let Some(line) = history.recv().await {
        file.write_all(line.as_bytes())
            .await
            .map_err(local_failure)?;
        file.write_all(b"\n").await.map_err(local_failure)?;
        file.flush().await.map_err(local_failure)?;
    }
    Ok(())
}
