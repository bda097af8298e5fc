//! In-process chat server speaking the minechat line protocol.
//!
//! Binds a read (broadcast) listener and a write (auth + send) listener on
//! `127.0.0.1:0`. Tests push chat lines with [`FakeChatServer::broadcast`],
//! inspect what clients sent with [`FakeChatServer::received`] and cut every
//! open connection with [`FakeChatServer::kick`].

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use minechat::protocol::Endpoint;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

pub const GREETING: &str =
    "Hello %username%! Enter your personal hash or leave it empty to create new account.\n";
pub const WELCOME: &str = "Welcome to chat! Post your message below. End it with an empty line.\n";
pub const SENT: &str = "Message send. Write more\n";

/// How the write channel behaves.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// The only token the server accepts.
    pub token: &'static str,
    /// Nickname reported for that token.
    pub nickname: &'static str,
    /// Answer every blank line with a confirmation. When off, the server
    /// goes silent after the welcome line.
    pub echo: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            token: "valid-token",
            nickname: "Steve",
            echo: true,
        }
    }
}

pub struct FakeChatServer {
    pub read_endpoint: Endpoint,
    pub write_endpoint: Endpoint,
    broadcast: broadcast::Sender<String>,
    kick: broadcast::Sender<()>,
    received: Arc<Mutex<Vec<String>>>,
    read_accepts: Arc<AtomicUsize>,
    write_accepts: Arc<AtomicUsize>,
}

impl FakeChatServer {
    pub async fn start(options: ServerOptions) -> Self {
        let read_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let write_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let read_endpoint = Endpoint::new("127.0.0.1", read_listener.local_addr().unwrap().port());
        let write_endpoint =
            Endpoint::new("127.0.0.1", write_listener.local_addr().unwrap().port());

        let (broadcast, _) = broadcast::channel(64);
        let (kick, _) = broadcast::channel(4);
        let server = Self {
            read_endpoint,
            write_endpoint,
            broadcast,
            kick,
            received: Arc::new(Mutex::new(Vec::new())),
            read_accepts: Arc::new(AtomicUsize::new(0)),
            write_accepts: Arc::new(AtomicUsize::new(0)),
        };

        tokio::spawn(serve_read(
            read_listener,
            server.broadcast.clone(),
            server.kick.clone(),
            server.read_accepts.clone(),
        ));
        tokio::spawn(serve_write(
            write_listener,
            options,
            server.kick.clone(),
            server.received.clone(),
            server.write_accepts.clone(),
        ));
        server
    }

    /// Sends a chat line to every connected reader.
    pub fn broadcast(&self, line: &str) {
        let _ = self.broadcast.send(line.to_string());
    }

    /// Drops every open connection on both channels.
    pub fn kick(&self) {
        let _ = self.kick.send(());
    }

    /// Lines received on the write channel after authentication.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn read_accepts(&self) -> usize {
        self.read_accepts.load(Ordering::SeqCst)
    }

    pub fn write_accepts(&self) -> usize {
        self.write_accepts.load(Ordering::SeqCst)
    }

    /// Waits until `n` readers have subscribed to broadcasts.
    pub async fn wait_for_readers(&self, n: usize) {
        wait_until(|| self.read_accepts() >= n).await;
    }
}

/// Polls `condition` every 10ms, panicking after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn serve_read(
    listener: TcpListener,
    broadcast: broadcast::Sender<String>,
    kick: broadcast::Sender<()>,
    accepts: Arc<AtomicUsize>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let mut lines = broadcast.subscribe();
        let mut kicked = kick.subscribe();
        accepts.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let (_read, mut write) = stream.into_split();
            loop {
                tokio::select! {
                    line = lines.recv() => match line {
                        Ok(line) => {
                            if write.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                                return;
                            }
                        }
                        Err(_) => return,
                    },
                    _ = kicked.recv() => return,
                }
            }
        });
    }
}

async fn serve_write(
    listener: TcpListener,
    options: ServerOptions,
    kick: broadcast::Sender<()>,
    received: Arc<Mutex<Vec<String>>>,
    accepts: Arc<AtomicUsize>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        accepts.fetch_add(1, Ordering::SeqCst);
        let mut kicked = kick.subscribe();
        let options = options.clone();
        let received = received.clone();
        tokio::spawn(async move {
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();

            if write.write_all(GREETING.as_bytes()).await.is_err() {
                return;
            }
            let token = match lines.next_line().await {
                Ok(Some(token)) => token,
                _ => return,
            };
            if token.trim() != options.token {
                let _ = write.write_all(b"null\n").await;
                return;
            }
            let record = format!(
                "{{\"nickname\": \"{}\", \"account_hash\": \"{}\"}}\n",
                options.nickname, options.token
            );
            if write.write_all(record.as_bytes()).await.is_err()
                || write.write_all(WELCOME.as_bytes()).await.is_err()
            {
                return;
            }

            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let blank = line.is_empty();
                            received.lock().unwrap().push(line);
                            if blank && options.echo && write.write_all(SENT.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                        _ => return,
                    },
                    _ = kicked.recv() => return,
                }
            }
        });
    }
}
