//! End-to-end sessions against an in-process chat server.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{wait_until, FakeChatServer, ServerOptions};
use minechat::protocol::Endpoint;
use minechat::session::{ConnectionSettings, ConnectionSupervisor};
use minechat::{
    chat_queues, ChannelRole, ChatError, ConnectionState, Observation, Observer, StatusEvent,
    UiQueues,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::timeout;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Observation>>,
}

impl Recorder {
    fn reconnect_reasons(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|o| match o {
                Observation::Reconnecting { reason, .. } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Observer for Recorder {
    fn record(&self, observation: &Observation) {
        self.seen.lock().unwrap().push(observation.clone());
    }
}

fn fast_settings(server: &FakeChatServer, token: &str) -> ConnectionSettings {
    fast_timings(ConnectionSettings::new(
        server.read_endpoint.clone(),
        server.write_endpoint.clone(),
        token,
    ))
}

fn fast_timings(mut settings: ConnectionSettings) -> ConnectionSettings {
    settings.connect_timeout = Duration::from_millis(500);
    settings.watchdog_timeout = Duration::from_millis(500);
    settings.reconnect_delay = Duration::from_millis(100);
    settings.heartbeat_interval = Duration::from_millis(100);
    settings
}

struct Running {
    ui: UiQueues,
    history: UnboundedReceiver<String>,
    recorder: Arc<Recorder>,
    handle: JoinHandle<Result<(), ChatError>>,
}

fn spawn_client(settings: ConnectionSettings) -> Running {
    let (core, ui, history) = chat_queues();
    let recorder = Arc::new(Recorder::default());
    let mut supervisor = ConnectionSupervisor::new(settings, core, recorder.clone());
    let handle = tokio::spawn(async move { supervisor.run().await });
    Running {
        ui,
        history,
        recorder,
        handle,
    }
}

/// Collects status events until `nickname` is reported.
async fn wait_for_login(status: &mut UnboundedReceiver<StatusEvent>, nickname: &str) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    let expected = StatusEvent::NicknameReceived(nickname.to_string());
    timeout(Duration::from_secs(5), async {
        while let Some(event) = status.recv().await {
            let done = event == expected;
            events.push(event);
            if done {
                return;
            }
        }
    })
    .await
    .expect("client never logged in");
    events
}

async fn recv_within<T>(rx: &mut UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("nothing received within 5s")
        .expect("queue closed")
}

#[tokio::test]
async fn login_reports_both_channels_then_nickname() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let mut client = spawn_client(fast_settings(&server, "valid-token"));

    let events = wait_for_login(&mut client.ui.status, "Steve").await;

    assert_eq!(
        events,
        vec![
            StatusEvent::connection(ChannelRole::Read, ConnectionState::Initiated),
            StatusEvent::connection(ChannelRole::Read, ConnectionState::Established),
            StatusEvent::connection(ChannelRole::Write, ConnectionState::Initiated),
            StatusEvent::connection(ChannelRole::Write, ConnectionState::Established),
            StatusEvent::NicknameReceived("Steve".to_string()),
        ]
    );
    client.handle.abort();
}

#[tokio::test]
async fn broadcast_lines_reach_messages_and_history_in_order() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let mut client = spawn_client(fast_settings(&server, "valid-token"));
    wait_for_login(&mut client.ui.status, "Steve").await;
    server.wait_for_readers(1).await;

    for line in ["a", "b", "c"] {
        server.broadcast(line);
    }

    for expected in ["a", "b", "c"] {
        assert_eq!(recv_within(&mut client.ui.messages).await, expected);
    }
    for expected in ["a", "b", "c"] {
        assert_eq!(recv_within(&mut client.history).await, expected);
    }
    client.handle.abort();
}

#[tokio::test]
async fn outgoing_message_is_sanitized_and_terminated_by_blank_line() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let mut client = spawn_client(fast_settings(&server, "valid-token"));
    wait_for_login(&mut client.ui.status, "Steve").await;

    client
        .ui
        .outgoing
        .send("hello\nthere\r".to_string())
        .unwrap();

    wait_until(|| {
        let received = server.received();
        received
            .iter()
            .position(|line| line == "hello there")
            .is_some_and(|i| received.get(i + 1).map(String::as_str) == Some(""))
    })
    .await;
    client.handle.abort();
}

#[tokio::test]
async fn dropped_connections_are_reestablished() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let mut client = spawn_client(fast_settings(&server, "valid-token"));
    wait_for_login(&mut client.ui.status, "Steve").await;

    server.kick();

    let events = wait_for_login(&mut client.ui.status, "Steve").await;
    assert!(events.contains(&StatusEvent::IdentityUnknown));
    assert!(events.contains(&StatusEvent::connection(
        ChannelRole::Read,
        ConnectionState::Closed
    )));
    assert!(server.write_accepts() >= 2);
    assert!(!client.recorder.reconnect_reasons().is_empty());

    server.wait_for_readers(2).await;
    server.broadcast("after reconnect");
    assert_eq!(recv_within(&mut client.ui.messages).await, "after reconnect");
    client.handle.abort();
}

#[tokio::test]
async fn message_typed_during_outage_is_sent_after_reconnect() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let mut client = spawn_client(fast_settings(&server, "valid-token"));
    wait_for_login(&mut client.ui.status, "Steve").await;

    server.kick();
    timeout(Duration::from_secs(5), async {
        while recv_within(&mut client.ui.status).await != StatusEvent::IdentityUnknown {}
    })
    .await
    .expect("disconnect never reported");
    client
        .ui
        .outgoing
        .send("typed while offline".to_string())
        .unwrap();

    wait_until(|| server.received().iter().any(|l| l == "typed while offline")).await;
    client.handle.abort();
}

#[tokio::test]
async fn silent_server_is_detected_by_watchdog() {
    let server = FakeChatServer::start(ServerOptions {
        echo: false,
        ..ServerOptions::default()
    })
    .await;
    let mut client = spawn_client(fast_settings(&server, "valid-token"));
    wait_for_login(&mut client.ui.status, "Steve").await;

    wait_until(|| !client.recorder.reconnect_reasons().is_empty()).await;

    let reasons = client.recorder.reconnect_reasons();
    assert!(reasons[0].contains("stale"), "got {reasons:?}");
    client.handle.abort();
}

#[tokio::test]
async fn server_silent_before_greeting_is_detected_by_watchdog() {
    let read = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let write = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let settings = fast_timings(ConnectionSettings::new(
        Endpoint::new("127.0.0.1", read.local_addr().unwrap().port()),
        Endpoint::new("127.0.0.1", write.local_addr().unwrap().port()),
        "valid-token",
    ));
    // Accepts every connection and never writes a byte.
    let mute = tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            tokio::select! {
                Ok((socket, _)) = read.accept() => held.push(socket),
                Ok((socket, _)) = write.accept() => held.push(socket),
                else => break,
            }
        }
    });
    let client = spawn_client(settings);

    wait_until(|| !client.recorder.reconnect_reasons().is_empty()).await;

    let reasons = client.recorder.reconnect_reasons();
    assert!(reasons[0].contains("stale"), "got {reasons:?}");
    client.handle.abort();
    mute.abort();
}

#[tokio::test]
async fn closed_send_queue_ends_the_run_after_delivery() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let client = spawn_client(fast_settings(&server, "valid-token"));

    client.ui.outgoing.send("last words".to_string()).unwrap();
    drop(client.ui.outgoing);

    let result = timeout(Duration::from_secs(5), client.handle)
        .await
        .expect("client kept running")
        .expect("client task panicked");

    assert!(result.is_ok(), "got {result:?}");
    wait_until(|| server.received().iter().any(|line| line == "last words")).await;
}

#[tokio::test]
async fn invalid_token_stops_without_retrying() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let client = spawn_client(fast_settings(&server, "wrong-token"));

    let result = timeout(Duration::from_secs(5), client.handle)
        .await
        .expect("client kept running")
        .expect("client task panicked");

    assert!(matches!(result, Err(ChatError::InvalidToken)), "got {result:?}");
    assert_eq!(server.write_accepts(), 1);
    assert!(client.recorder.reconnect_reasons().is_empty());
}

#[tokio::test]
async fn unreachable_server_keeps_retrying() {
    let server = FakeChatServer::start(ServerOptions::default()).await;
    let mut settings = fast_settings(&server, "valid-token");
    // Nothing listens on the read port once this listener is gone.
    let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    settings.read_endpoint.port = dead.local_addr().unwrap().port();
    drop(dead);
    let client = spawn_client(settings);

    wait_until(|| client.recorder.reconnect_reasons().len() >= 3).await;

    assert!(!client.handle.is_finished());
    assert_eq!(server.write_accepts(), 0);
    client.handle.abort();
}
