//! `minechat register`: create an account and keep its token.

use std::path::Path;
use std::process::ExitCode;

use minechat::config::{xdg, Config, Timings};
use minechat::protocol::{register, validate_nickname, Endpoint, Identity, LineChannel};
use minechat::status::ChannelRole;
use minechat::ChatError;
use tokio::time::timeout;

/// Registers `nickname` on the sending channel (or `host`/`port` when
/// given), prints the new token and saves it to the token file.
pub(crate) fn run_register_command(
    config: &Config,
    nickname: &str,
    host: Option<String>,
    port: Option<u16>,
) -> ExitCode {
    let Some(nickname) = validate_nickname(nickname) else {
        eprintln!("Error: nickname must not be empty");
        return ExitCode::from(2);
    };

    let timings = match config.timings() {
        Ok(timings) => timings,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let endpoint = Endpoint::new(
        host.unwrap_or_else(|| config.server.write_host.clone()),
        port.unwrap_or(config.server.write_port),
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let identity = match runtime.block_on(register_account(&endpoint, nickname, timings)) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("registration at {} failed: {}", endpoint, e);
            eprintln!("Error: registration failed, try later ({e})");
            return ExitCode::FAILURE;
        }
    };

    let Some(token) = identity.token else {
        eprintln!("Error: registration failed, try later (no token issued)");
        return ExitCode::FAILURE;
    };
    println!("Registered as {}", identity.nickname);
    println!("Token: {token}");

    let token_path = config.token_path();
    match save_token(&token_path, &token) {
        Ok(()) => println!("Token saved to {}", token_path.display()),
        Err(e) => eprintln!(
            "Warning: could not save token to {}: {e}. Save it by hand.",
            token_path.display()
        ),
    }
    ExitCode::SUCCESS
}

/// Connects and registers. The exchange after connecting gets one watchdog
/// period; a server that goes quiet fails as [`ChatError::ConnectionStale`].
async fn register_account(
    endpoint: &Endpoint,
    nickname: &str,
    timings: Timings,
) -> Result<Identity, ChatError> {
    // Registration has no presentation layer listening for status events.
    let (status, _ignored) = tokio::sync::mpsc::unbounded_channel();
    let mut channel =
        LineChannel::open(endpoint, ChannelRole::Write, timings.connect_timeout, status).await?;
    let (reader, writer) = channel.halves();
    let stale_after = timings.watchdog_timeout;
    let result = match timeout(stale_after, register(nickname, reader, writer)).await {
        Ok(result) => result,
        Err(_) => Err(ChatError::ConnectionStale {
            timeout: stale_after,
        }),
    };
    channel.close().await;
    result
}

fn save_token(path: &Path, token: &str) -> std::io::Result<()> {
    xdg::ensure_parent(path)?;
    std::fs::write(path, format!("{token}\n"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
