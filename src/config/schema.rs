//! TOML configuration schema types.
//!
//! All structs derive `Deserialize` and `Serialize` with defaults via
//! `#[serde(default)]`, so a partial file (or an empty one) is valid.
//!
//! Duration fields use human-readable strings (e.g. `"2s"`, `"500ms"`)
//! parsed by the `humantime` crate when settings are resolved.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// ```toml
/// [server]
/// [auth]
/// [timing]
/// [history]
/// [log]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Chat server endpoints.
    pub server: ServerConfig,
    /// Account token source.
    pub auth: AuthConfig,
    /// Connection timings.
    pub timing: TimingConfig,
    /// Chat history file.
    pub history: HistoryConfig,
    /// Logging.
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Read and write channel endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host of the broadcast channel.
    pub read_host: String,
    /// Port of the broadcast channel.
    pub read_port: u16,
    /// Host of the authentication and sending channel.
    pub write_host: String,
    /// Port of the authentication and sending channel.
    pub write_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_host: "minechat.dvmn.org".to_string(),
            read_port: 5000,
            write_host: "minechat.dvmn.org".to_string(),
            write_port: 5050,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Where the account token comes from.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Token to authenticate with. Empty means read it from `token_path`.
    pub token: String,
    /// Token file. Empty means `$XDG_DATA_HOME/minechat/token`.
    pub token_path: String,
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Connection timings as human-readable durations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Bound on each TCP connect.
    pub connect_timeout: String,
    /// Silence tolerated before a session is considered dead.
    pub watchdog_timeout: String,
    /// Pause before reconnecting.
    pub reconnect_delay: String,
    /// Interval between keep-alive pings.
    pub heartbeat_interval: String,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            connect_timeout: "1s".to_string(),
            watchdog_timeout: "2s".to_string(),
            reconnect_delay: "1s".to_string(),
            heartbeat_interval: "1s".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Chat history file location.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// History file. Empty means `$XDG_DATA_HOME/minechat/history.log`.
    pub path: String,
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Default verbosity when `MINECHAT_LOG` is not set.
    pub level: LogLevel,
}

/// Log verbosity levels (kebab-case in TOML and on the command line).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational messages.
    #[default]
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// The `tracing` filter directive for this level.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
