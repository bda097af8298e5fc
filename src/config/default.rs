//! Default configuration template and file creation.
//!
//! Provides a commented TOML template that matches `Config::default()` and
//! writes it to the XDG config path (or any path the caller chooses).

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

// ---------------------------------------------------------------------------
// Default TOML template
// ---------------------------------------------------------------------------

/// A commented TOML template with all default values.
///
/// Every value here must match `Config::default()` from `schema.rs`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# minechat configuration
#
# All values shown below are the built-in defaults.
# Command-line flags and MINECHAT_* environment variables override them.
#
# Location: $XDG_CONFIG_HOME/minechat/config.toml

# ==============================================================================
# Server
# ==============================================================================

[server]

# Broadcast channel: chat messages are only received here.
read_host = "minechat.dvmn.org"
read_port = 5000

# Authentication and sending channel.
write_host = "minechat.dvmn.org"
write_port = 5050

# ==============================================================================
# Authentication
# ==============================================================================

[auth]

# Account token. Leave empty to read it from token_path.
# `minechat register` creates an account and saves its token there.
token = ""

# Token file. Empty means $XDG_DATA_HOME/minechat/token.
# Tilde (~) is expanded to the user's home directory.
token_path = ""

# ==============================================================================
# Timing
# ==============================================================================

[timing]

# Human-readable durations, e.g. "500ms", "2s", "1m".

# Bound on each TCP connect attempt.
connect_timeout = "1s"

# A session with no activity for this long is torn down and reconnected.
watchdog_timeout = "2s"

# Pause between a failed session and the next attempt.
reconnect_delay = "1s"

# Interval between keep-alive pings on the write channel.
heartbeat_interval = "1s"

# ==============================================================================
# History
# ==============================================================================

[history]

# Every received message is appended here and replayed on start.
# Empty means $XDG_DATA_HOME/minechat/history.log.
path = ""

# ==============================================================================
# Logging
# ==============================================================================

[log]

# Options: "error", "warn", "info", "debug", "trace"
# MINECHAT_LOG (tracing filter directives) takes precedence when set.
level = "info"
"#;

// ---------------------------------------------------------------------------
// File creation functions
// ---------------------------------------------------------------------------

/// Creates (or force-overwrites) the default config file at the XDG path.
pub fn create_default_config(force: bool) -> Result<PathBuf, ConfigError> {
    let path = xdg::config_path();
    create_config_at(&path, force)?;
    Ok(path)
}

/// Writes the default template to `path`.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, backs it up to `.toml.backup` first.
pub fn create_config_at(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(path)
}

/// Writes the template, creating parent dirs and setting 0600 permissions.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    xdg::ensure_parent(path).map_err(write_error)?;
    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_error)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
