//! minechat - CLI entry point
//!
//! `minechat` (or `minechat chat`) joins the chat from the terminal,
//! `minechat register` creates an account, `minechat config` manages the
//! configuration file.

use clap::{Args, Parser, Subcommand};
use minechat::config::{Config, ConfigLoader, LogLevel, Overrides};
use minechat::logging;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod commands;

/// Resilient terminal client for the minechat server
#[derive(Parser)]
#[command(name = "minechat")]
#[command(version, about = "Resilient terminal client for the minechat server")]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/minechat/config.toml)
    #[arg(long, global = true, env = "MINECHAT_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Settings that override the configuration file.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// Broadcast channel host
    #[arg(long, global = true, env = "MINECHAT_READ_HOST")]
    read_host: Option<String>,

    /// Broadcast channel port
    #[arg(long, global = true, env = "MINECHAT_READ_PORT")]
    read_port: Option<u16>,

    /// Sending channel host
    #[arg(long, global = true, env = "MINECHAT_WRITE_HOST")]
    write_host: Option<String>,

    /// Sending channel port
    #[arg(long, global = true, env = "MINECHAT_WRITE_PORT")]
    write_port: Option<u16>,

    /// Account token
    #[arg(long, global = true, env = "MINECHAT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Chat history file
    #[arg(long, global = true, env = "MINECHAT_HISTORY_PATH", value_name = "FILEPATH")]
    history_path: Option<PathBuf>,

    /// Logging level (MINECHAT_LOG filter directives take precedence)
    #[arg(long = "loglevel", global = true, env = "MINECHAT_LOGLEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

impl ConnectionArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            read_host: self.read_host,
            read_port: self.read_port,
            write_host: self.write_host,
            write_port: self.write_port,
            token: self.token,
            history_path: self.history_path,
            log_level: self.log_level,
        }
    }
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Join the chat from the terminal (default)
    Chat,

    /// Create a new account and save its token
    Register {
        /// Nickname to register under
        #[arg(long)]
        nickname: String,

        /// Registration host (default: the sending channel host)
        #[arg(long)]
        host: Option<String>,

        /// Registration port (default: the sending channel port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration file actions
#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Overwrite an existing file (a backup is kept)
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
    /// Load the configuration file and print the result
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Config { action } => commands::run_config_command(action, config_path.as_deref()),
        Commands::Chat => match load_config(config_path.as_deref(), cli.connection) {
            Some(config) => commands::run_chat_command(&config),
            None => ExitCode::FAILURE,
        },
        Commands::Register {
            nickname,
            host,
            port,
        } => match load_config(config_path.as_deref(), cli.connection) {
            Some(config) => commands::run_register_command(&config, &nickname, host, port),
            None => ExitCode::FAILURE,
        },
    }
}

/// Loads the config file, applies command-line and environment overrides
/// and starts logging.
fn load_config(path: Option<&Path>, connection: ConnectionArgs) -> Option<Config> {
    let mut config = match ConfigLoader::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return None;
        }
    };
    config.apply(connection.into_overrides());
    logging::init(config.log.level);
    Some(config)
}
