//! Per-session network loops.
//!
//! None of these loops own their channel; the supervisor lends them halves
//! of the session's [`LineChannel`](crate::protocol::LineChannel)s and drops
//! the loop futures when the session ends. Every await point is
//! cancel-safe, so dropping a loop never loses queued work: an unsent
//! message stays in the send queue and a half-read line stays in the
//! reader's buffer.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::error::ChatError;
use crate::protocol::line::{LineReader, LineWriter, ReadLine};
use crate::queues::LivenessSender;
use crate::session::watchdog::LivenessEvent;
use crate::status::ChannelRole;

/// Forwards every chat line from the read channel to the message and
/// history queues, reporting liveness for each.
///
/// Blank and undecodable lines are skipped. Returns `Ok(())` when the
/// server closes the stream.
pub async fn read_messages<R>(
    reader: &mut LineReader<R>,
    messages: &UnboundedSender<String>,
    history: &UnboundedSender<String>,
    liveness: &LivenessSender,
) -> Result<(), ChatError>
where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.read_line().await? {
            ReadLine::Eof => {
                tracing::info!("read channel reached end of stream");
                return Ok(());
            }
            ReadLine::Malformed => continue,
            ReadLine::Line(line) if line.is_empty() => continue,
            ReadLine::Line(line) => {
                let _ = liveness.send(LivenessEvent::MessageReceived);
                let _ = messages.send(line.clone());
                let _ = history.send(line);
            }
        }
    }
}

/// Writes queued user messages and periodic keep-alive pings.
///
/// Each message is followed by a blank line; the server only shows a
/// message once it sees the empty line after it. Pings are bare newlines
/// every `heartbeat` and do not count as liveness themselves: the server's
/// echo does (see [`read_echoes`]). Pending messages take priority over a
/// due ping. Returns `Ok(())` once every sender is gone and the queue is
/// empty.
pub async fn send_messages<W>(
    writer: &mut LineWriter<W>,
    outgoing: &mut UnboundedReceiver<String>,
    liveness: &LivenessSender,
    heartbeat: Duration,
) -> Result<(), ChatError>
where
    W: AsyncWrite + Unpin,
{
    let mut ping = interval(heartbeat);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            message = outgoing.recv() => {
                let Some(message) = message else {
                    return Ok(());
                };
                tracing::debug!("user wrote {:?}", message);
                writer.write_line(&message).await?;
                writer.write_line("").await?;
                let _ = liveness.send(LivenessEvent::MessageSent);
            }
            _ = ping.tick() => {
                writer.write_line("").await?;
            }
        }
    }
}

/// Drains whatever the server sends back on the write channel and reports
/// each line as a heartbeat echo.
///
/// Each read waits at most `read_timeout`; a timed-out read is not an
/// error, the watchdog decides when silence is fatal. End of stream is
/// [`ChatError::ChannelClosed`], so a dead socket cannot spin this loop.
pub async fn read_echoes<R>(
    reader: &mut LineReader<R>,
    liveness: &LivenessSender,
    read_timeout: Duration,
) -> Result<(), ChatError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = match timeout(read_timeout, reader.read_line()).await {
            Ok(line) => line?,
            Err(_) => continue,
        };
        match line {
            ReadLine::Eof => {
                tracing::info!("write channel reached end of stream");
                return Err(ChatError::ChannelClosed {
                    role: ChannelRole::Write,
                });
            }
            ReadLine::Line(_) | ReadLine::Malformed => {
                let _ = liveness.send(LivenessEvent::HeartbeatEcho);
            }
        }
    }
}

/// The write side of a session: outgoing messages, pings and echo reads
/// running together. Ends as soon as either loop ends; `Ok(())` only when
/// the send queue is finished.
pub async fn write_worker<R, W>(
    reader: &mut LineReader<R>,
    writer: &mut LineWriter<W>,
    outgoing: &mut UnboundedReceiver<String>,
    liveness: &LivenessSender,
    heartbeat: Duration,
    read_timeout: Duration,
) -> Result<(), ChatError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tokio::select! {
        result = send_messages(writer, outgoing, liveness, heartbeat) => result,
        result = read_echoes(reader, liveness, read_timeout) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc::unbounded_channel;
    use tokio::time::sleep;

    fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn read_messages_preserves_order_in_both_queues() {
        let (mut server, client) = duplex(1024);
        let mut reader = LineReader::new(ChannelRole::Read, client);
        let (messages_tx, mut messages_rx) = unbounded_channel();
        let (history_tx, mut history_rx) = unbounded_channel();
        let (liveness_tx, mut liveness_rx) = unbounded_channel();

        server.write_all(b"a\nb\nc\n").await.unwrap();
        drop(server);

        read_messages(&mut reader, &messages_tx, &history_tx, &liveness_tx)
            .await
            .unwrap();

        assert_eq!(drain(&mut messages_rx), vec!["a", "b", "c"]);
        assert_eq!(drain(&mut history_rx), vec!["a", "b", "c"]);
        assert_eq!(
            drain(&mut liveness_rx),
            vec![LivenessEvent::MessageReceived; 3]
        );
    }

    #[tokio::test]
    async fn read_messages_skips_blank_and_corrupt_lines() {
        let (mut server, client) = duplex(1024);
        let mut reader = LineReader::new(ChannelRole::Read, client);
        let (messages_tx, mut messages_rx) = unbounded_channel();
        let (history_tx, _history_rx) = unbounded_channel();
        let (liveness_tx, _liveness_rx) = unbounded_channel();

        server.write_all(b"first\n\n\xc3\x28\nsecond\n").await.unwrap();
        drop(server);

        read_messages(&mut reader, &messages_tx, &history_tx, &liveness_tx)
            .await
            .unwrap();

        assert_eq!(drain(&mut messages_rx), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn send_messages_writes_message_blank_line_and_pings() {
        let (mut server, client) = duplex(1024);
        let mut writer = LineWriter::new(ChannelRole::Write, client);
        let (outgoing_tx, mut outgoing_rx) = unbounded_channel();
        let (liveness_tx, mut liveness_rx) = unbounded_channel();
        outgoing_tx.send("hello\nworld".to_string()).unwrap();

        tokio::select! {
            result = send_messages(&mut writer, &mut outgoing_rx, &liveness_tx, Duration::from_secs(1)) => {
                panic!("sender stopped early: {result:?}");
            }
            _ = sleep(Duration::from_millis(2500)) => {}
        }
        drop(writer);

        let mut wire = String::new();
        server.read_to_string(&mut wire).await.unwrap();
        // message, its blank line, then pings at 0s, 1s and 2s
        assert_eq!(wire, "hello world\n\n\n\n\n");
        assert_eq!(drain(&mut liveness_rx), vec![LivenessEvent::MessageSent]);
    }

    #[tokio::test]
    async fn send_messages_drains_queue_before_finishing() {
        let (mut server, client) = duplex(1024);
        let mut writer = LineWriter::new(ChannelRole::Write, client);
        let (outgoing_tx, mut outgoing_rx) = unbounded_channel();
        let (liveness_tx, _liveness_rx) = unbounded_channel();
        outgoing_tx.send("one".to_string()).unwrap();
        outgoing_tx.send("two".to_string()).unwrap();
        drop(outgoing_tx);

        send_messages(&mut writer, &mut outgoing_rx, &liveness_tx, Duration::from_secs(60))
            .await
            .unwrap();
        drop(writer);

        let mut wire = String::new();
        server.read_to_string(&mut wire).await.unwrap();
        assert_eq!(wire, "one\n\ntwo\n\n");
    }

    #[tokio::test]
    async fn send_messages_fails_when_peer_is_gone() {
        let (server, client) = duplex(64);
        drop(server);
        let mut writer = LineWriter::new(ChannelRole::Write, client);
        let (_outgoing_tx, mut outgoing_rx) = unbounded_channel::<String>();
        let (liveness_tx, _liveness_rx) = unbounded_channel();

        let err = send_messages(&mut writer, &mut outgoing_rx, &liveness_tx, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::WriteFailure { .. }));
    }

    #[tokio::test]
    async fn cancelled_sender_leaves_unsent_messages_queued() {
        let (_server, client) = duplex(1024);
        let mut writer = LineWriter::new(ChannelRole::Write, client);
        let (outgoing_tx, mut outgoing_rx) = unbounded_channel::<String>();
        let (liveness_tx, _liveness_rx) = unbounded_channel();

        tokio::select! {
            _ = send_messages(&mut writer, &mut outgoing_rx, &liveness_tx, Duration::from_secs(60)) => {}
            _ = tokio::task::yield_now() => {}
        }
        outgoing_tx.send("typed during outage".to_string()).unwrap();

        assert_eq!(
            outgoing_rx.recv().await.as_deref(),
            Some("typed during outage")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn read_echoes_treats_timeouts_as_no_op() {
        let (mut server, client) = duplex(1024);
        let mut reader = LineReader::new(ChannelRole::Write, client);
        let (liveness_tx, mut liveness_rx) = unbounded_channel();

        let server_task = tokio::spawn(async move {
            sleep(Duration::from_secs(5)).await;
            server.write_all(b"\n").await.unwrap();
            server.write_all(b"echo\n").await.unwrap();
        });

        let err = read_echoes(&mut reader, &liveness_tx, Duration::from_millis(500))
            .await
            .unwrap_err();
        server_task.await.unwrap();

        assert!(matches!(
            err,
            ChatError::ChannelClosed {
                role: ChannelRole::Write
            }
        ));

        assert_eq!(
            drain(&mut liveness_rx),
            vec![LivenessEvent::HeartbeatEcho; 2]
        );
    }
}
