//! Hand-off queues between the connection core and its collaborators.
//!
//! Every queue is an unbounded tokio mpsc channel, so producers never wait on
//! consumers. Each queue has exactly one consumer:
//!
//! | queue    | producers                          | consumer          |
//! |----------|------------------------------------|-------------------|
//! | messages | read worker, history restore       | presentation      |
//! | send     | presentation                       | write worker      |
//! | history  | read worker                        | history writer    |
//! | watchdog | handshake, workers, echo reader    | watchdog          |
//! | status   | line channels, supervisor          | presentation      |
//!
//! The queues outlive individual sessions. Only the sockets are replaced on
//! reconnect, so a message typed during an outage stays in the send queue
//! until a new session picks it up.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::session::watchdog::LivenessEvent;
use crate::status::StatusEvent;

/// Producer end of the status queue.
pub type StatusSender = UnboundedSender<StatusEvent>;

/// Producer end of the watchdog queue.
pub type LivenessSender = UnboundedSender<LivenessEvent>;

/// Queue ends held by the connection supervisor across reconnects.
#[derive(Debug)]
pub struct CoreQueues {
    /// Received chat lines for display.
    pub messages: UnboundedSender<String>,
    /// Received chat lines for persistence.
    pub history: UnboundedSender<String>,
    /// Lifecycle and identity notifications.
    pub status: StatusSender,
    /// Outgoing text typed by the user.
    pub outgoing: UnboundedReceiver<String>,
    /// Producer side of the watchdog queue, cloned into each worker.
    pub liveness: LivenessSender,
    /// Consumer side of the watchdog queue.
    pub liveness_events: UnboundedReceiver<LivenessEvent>,
}

/// Queue ends held by the presentation layer.
#[derive(Debug)]
pub struct UiQueues {
    /// Chat lines to display, in arrival order.
    pub messages: UnboundedReceiver<String>,
    /// Connection status notifications.
    pub status: UnboundedReceiver<StatusEvent>,
    /// Enqueue-only sink for outgoing text.
    pub outgoing: UnboundedSender<String>,
}

/// Creates all five queues and splits them by consumer.
///
/// Returns the supervisor ends, the presentation ends and the receiving end
/// of the history queue.
pub fn chat_queues() -> (CoreQueues, UiQueues, UnboundedReceiver<String>) {
    let (messages_tx, messages_rx) = mpsc::unbounded_channel();
    let (history_tx, history_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
    let (liveness_tx, liveness_rx) = mpsc::unbounded_channel();

    let core = CoreQueues {
        messages: messages_tx,
        history: history_tx,
        status: status_tx,
        outgoing: outgoing_rx,
        liveness: liveness_tx,
        liveness_events: liveness_rx,
    };
    let ui = UiQueues {
        messages: messages_rx,
        status: status_rx,
        outgoing: outgoing_tx,
    };
    (core, ui, history_rx)
}
