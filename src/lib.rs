//! minechat: a resilient client for a two-channel line-protocol chat server.
//!
//! The server exposes two TCP endpoints. The read channel only broadcasts
//! chat lines; the write channel authenticates the user and accepts outgoing
//! messages. The client keeps both alive, detects silent stalls with a
//! watchdog and reconnects indefinitely, while the presentation layer talks
//! to it only through the queues in [`queues`].
//!
//! # Layout
//!
//! - [`protocol`]: line framing, TCP channels and the handshakes.
//! - [`session`]: per-session workers, watchdog, supervisor and the
//!   reconnect loop.
//! - [`history`]: history replay and persistence.
//! - [`config`] and [`logging`]: the ambient layers used by the binary.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use minechat::protocol::Endpoint;
//! use minechat::session::{ConnectionSettings, ConnectionSupervisor};
//! use minechat::{chat_queues, TracingObserver};
//!
//! # async fn demo() -> Result<(), minechat::ChatError> {
//! let (core, ui, _history) = chat_queues();
//! let settings = ConnectionSettings::new(
//!     Endpoint::new("minechat.dvmn.org", 5000),
//!     Endpoint::new("minechat.dvmn.org", 5050),
//!     "my-token",
//! );
//! let mut supervisor = ConnectionSupervisor::new(settings, core, Arc::new(TracingObserver));
//! ui.outgoing.send("hello".to_string()).ok();
//! supervisor.run().await
//! # }
//! ```

/// Layered TOML configuration.
pub mod config;

/// Error taxonomy.
pub mod error;

/// History replay and persistence.
pub mod history;

/// `tracing` subscriber setup.
pub mod logging;

/// Observability sink.
pub mod observe;

/// Line protocol: framing, channels, handshakes.
pub mod protocol;

/// Queues between the connection core and its collaborators.
pub mod queues;

/// Connection supervision and reconnection.
pub mod session;

/// Status events for the presentation layer.
pub mod status;

pub use error::ChatError;
pub use observe::{Observation, Observer, TracingObserver};
pub use queues::{chat_queues, CoreQueues, UiQueues};
pub use status::{ChannelRole, ConnectionState, StatusEvent};
