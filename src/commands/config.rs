//! `minechat config` subcommands.

use std::path::Path;
use std::process::ExitCode;

use minechat::config::{default, xdg, ConfigError, ConfigLoader};

use crate::ConfigAction;

/// Runs a config action against `path`, or the XDG default when `None`.
pub(crate) fn run_config_command(action: ConfigAction, path: Option<&Path>) -> ExitCode {
    let result: Result<(), ConfigError> = match action {
        ConfigAction::Init { force } => {
            let created = match path {
                Some(path) => default::create_config_at(path, force).map(|()| path.to_path_buf()),
                None => default::create_default_config(force),
            };
            created.map(|path| println!("Created configuration at {}", path.display()))
        }
        ConfigAction::Path => {
            let resolved = path.map(Path::to_path_buf).unwrap_or_else(xdg::config_path);
            println!("{}", resolved.display());
            Ok(())
        }
        ConfigAction::Validate => ConfigLoader::load(path).map(|config| {
            println!("Configuration is valid");
            println!("{config:#?}");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}
