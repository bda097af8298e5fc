//! `minechat chat`: line-oriented terminal front end.
//!
//! Typed lines go to the send queue, chat messages go to stdout and
//! connection status goes to stderr. The display, the history writer and
//! the reconnect loop run side by side; whichever finishes first ends the
//! process. End of input only closes the send queue, so the reconnect loop
//! finishes once everything typed has been delivered.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use minechat::config::Config;
use minechat::session::{ConnectionSettings, ConnectionSupervisor};
use minechat::{chat_queues, history, ChatError, StatusEvent, TracingObserver, UiQueues};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Runs the chat until input is exhausted and sent, Ctrl-C, or a fatal
/// error.
pub(crate) fn run_chat_command(config: &Config) -> ExitCode {
    let settings = match config.connection_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let history_path = config.history_path();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(chat(settings, history_path));
    // A pending stdin read sits on a blocking thread that nothing can wake.
    runtime.shutdown_background();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", e.title(), e);
            ExitCode::FAILURE
        }
    }
}

async fn chat(settings: ConnectionSettings, history_path: PathBuf) -> Result<(), ChatError> {
    let (core, ui, mut history_rx) = chat_queues();
    let UiQueues {
        messages,
        status,
        outgoing,
    } = ui;

    history::restore(&history_path, &core.messages).await;
    let mut supervisor = ConnectionSupervisor::new(settings, core, Arc::new(TracingObserver));
    let input = tokio::spawn(forward_input(outgoing));

    let result = tokio::select! {
        result = supervisor.run() => result,
        result = history::save(&history_path, &mut history_rx) => result,
        _ = display(messages, status) => Ok(()),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            Ok(())
        }
    };
    input.abort();
    result
}

/// Prints chat messages to stdout and status notices to stderr until both
/// queues are closed.
async fn display(
    mut messages: UnboundedReceiver<String>,
    mut status: UnboundedReceiver<StatusEvent>,
) {
    let mut messages_open = true;
    let mut status_open = true;
    while messages_open || status_open {
        tokio::select! {
            message = messages.recv(), if messages_open => match message {
                Some(message) => println!("{message}"),
                None => messages_open = false,
            },
            event = status.recv(), if status_open => match event {
                Some(event) => eprintln!("{}", render_status(&event)),
                None => status_open = false,
            },
        }
    }
}

fn render_status(event: &StatusEvent) -> String {
    match event {
        StatusEvent::NicknameReceived(nickname) => format!("Logged in as {nickname}"),
        other => other.to_string(),
    }
}

/// Queues every non-blank stdin line for sending. Returns at end of input,
/// dropping the sender so the send queue closes.
async fn forward_input(outgoing: UnboundedSender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                if outgoing.send(line).is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("stopped reading input: {}", e);
                return;
            }
        }
    }
}
