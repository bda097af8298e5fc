//! Layered configuration: command line, environment, TOML file, defaults.
//!
//! Command-line flags and `MINECHAT_*` environment variables are parsed by
//! clap into [`Overrides`]; [`Config::apply`] lays them over whatever the
//! TOML file (or the built-in defaults) provided.

use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::Endpoint;
use crate::session::ConnectionSettings;

/// Default configuration template and file creation.
pub mod default;

/// Configuration error types.
pub mod error;

/// Configuration file loader.
pub mod loader;

/// TOML configuration schema types.
pub mod schema;

/// XDG Base Directory path resolution utilities.
pub mod xdg;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{Config, LogLevel};

/// Values supplied on the command line or through the environment.
///
/// `None` leaves the file or default value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces `server.read_host`.
    pub read_host: Option<String>,
    /// Replaces `server.read_port`.
    pub read_port: Option<u16>,
    /// Replaces `server.write_host`.
    pub write_host: Option<String>,
    /// Replaces `server.write_port`.
    pub write_port: Option<u16>,
    /// Replaces `auth.token`; wins over the token file.
    pub token: Option<String>,
    /// Replaces `history.path`.
    pub history_path: Option<PathBuf>,
    /// Replaces `log.level`. `MINECHAT_LOG` still wins at runtime.
    pub log_level: Option<LogLevel>,
}

/// The `[timing]` table with every value parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Bound on each TCP connect.
    pub connect_timeout: Duration,
    /// Silence tolerated before a connection is declared stale.
    pub watchdog_timeout: Duration,
    /// Pause between sessions.
    pub reconnect_delay: Duration,
    /// Interval between keep-alive pings.
    pub heartbeat_interval: Duration,
}

impl Config {
    /// Lays `overrides` over this configuration.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.read_host {
            self.server.read_host = host;
        }
        if let Some(port) = overrides.read_port {
            self.server.read_port = port;
        }
        if let Some(host) = overrides.write_host {
            self.server.write_host = host;
        }
        if let Some(port) = overrides.write_port {
            self.server.write_port = port;
        }
        if let Some(token) = overrides.token {
            self.auth.token = token;
        }
        if let Some(path) = overrides.history_path {
            self.history.path = path.to_string_lossy().into_owned();
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
    }

    /// Where the chat history is appended.
    pub fn history_path(&self) -> PathBuf {
        if self.history.path.is_empty() {
            xdg::history_path()
        } else {
            xdg::expand_tilde(&self.history.path)
        }
    }

    /// Where the account token is read from and saved to.
    pub fn token_path(&self) -> PathBuf {
        if self.auth.token_path.is_empty() {
            xdg::token_path()
        } else {
            xdg::expand_tilde(&self.auth.token_path)
        }
    }

    /// Read-channel endpoint.
    pub fn read_endpoint(&self) -> Endpoint {
        Endpoint::new(self.server.read_host.clone(), self.server.read_port)
    }

    /// Write-channel endpoint.
    pub fn write_endpoint(&self) -> Endpoint {
        Endpoint::new(self.server.write_host.clone(), self.server.write_port)
    }

    /// The account token: the configured value if set, otherwise the first
    /// line of the token file.
    pub fn token(&self) -> Result<String, ConfigError> {
        let token = self.auth.token.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
        let path = self.token_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::MissingToken { path })
            }
            Err(source) => return Err(ConfigError::ReadError { path, source }),
        };
        match content.lines().next().map(str::trim) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(ConfigError::MissingToken { path }),
        }
    }

    /// Parses the `[timing]` table, naming the first bad field.
    pub fn timings(&self) -> Result<Timings, ConfigError> {
        let timing = &self.timing;
        Ok(Timings {
            connect_timeout: parse_duration("timing.connect_timeout", &timing.connect_timeout)?,
            watchdog_timeout: parse_duration("timing.watchdog_timeout", &timing.watchdog_timeout)?,
            reconnect_delay: parse_duration("timing.reconnect_delay", &timing.reconnect_delay)?,
            heartbeat_interval: parse_duration(
                "timing.heartbeat_interval",
                &timing.heartbeat_interval,
            )?,
        })
    }

    /// Resolves everything a connection supervisor needs, including the
    /// token and parsed timings.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, ConfigError> {
        let timings = self.timings()?;
        Ok(ConnectionSettings {
            read_endpoint: self.read_endpoint(),
            write_endpoint: self.write_endpoint(),
            token: self.token()?,
            connect_timeout: timings.connect_timeout,
            watchdog_timeout: timings.watchdog_timeout,
            reconnect_delay: timings.reconnect_delay,
            heartbeat_interval: timings.heartbeat_interval,
        })
    }
}

/// Parses a human-readable duration such as `"1s"` or `"500ms"`.
pub fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidDuration {
        field: field.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}
