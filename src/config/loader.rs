//! Reads `config.toml` and rejects it early if anything in it is unusable.
//!
//! An explicit `--config` path must exist. The XDG location is optional:
//! when nothing is there the built-in defaults apply. Timing values are
//! parsed at load time, so `minechat config validate` reports a bad
//! duration the same way it reports a TOML syntax error.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::config::xdg;

/// Stateless configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `explicit` when given, otherwise the XDG config file if one
    /// exists, otherwise [`Config::default`].
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let path = explicit.map_or_else(xdg::config_path, Path::to_path_buf);
        let config = match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, &path)?,
            Err(e) if e.kind() == ErrorKind::NotFound && explicit.is_none() => {
                tracing::debug!("no config file at {}, using defaults", path.display());
                Config::default()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound { path })
            }
            Err(source) => return Err(ConfigError::ReadError { path, source }),
        };
        config.timings()?;
        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map_or((0, 0), |span| line_column(content, span.start));
            ConfigError::ParseError {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }
}

/// One-based line and column of a byte offset.
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = content.get(..offset).unwrap_or(content);
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (before.matches('\n').count() + 1, before.len() - line_start + 1)
}
