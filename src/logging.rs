//! Logging initialization.
//!
//! Configures the `tracing` subscriber with level filtering via the
//! `MINECHAT_LOG` environment variable. When the variable is unset or
//! invalid, the configured `[log] level` applies.
//!
//! # Usage
//!
//! ```bash
//! # Configured level (info by default)
//! minechat
//!
//! # Debug everything
//! MINECHAT_LOG=debug minechat
//!
//! # Quiet except watchdog activity
//! MINECHAT_LOG=warn,watchdog=debug minechat
//! ```

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "MINECHAT_LOG";

/// Builds the filter: `MINECHAT_LOG` when it parses, else `fallback`.
pub fn filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback.as_str()))
}

/// Initialize the global tracing subscriber.
///
/// Output goes to stderr so it never mixes with chat text on stdout. A
/// second call is ignored.
pub fn init(fallback: LogLevel) {
    let _ = fmt()
        .with_env_filter(filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
