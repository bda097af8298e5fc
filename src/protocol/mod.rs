//! The minechat line protocol: framing, channels and handshakes.

/// TCP line channel with lifecycle reporting.
pub mod channel;

/// Authentication and registration exchanges.
pub mod handshake;

/// Line framing and sanitization.
pub mod line;

pub use channel::{ChannelPhase, Endpoint, LineChannel};
pub use handshake::{authenticate, register, validate_nickname, Identity};
pub use line::{sanitize, LineReader, LineWriter, ReadLine};
