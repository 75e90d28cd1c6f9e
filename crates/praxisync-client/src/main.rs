//! praxisync CLI entry point.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use praxisync_client::cli::{Cli, Command};
use praxisync_client::commands;
use praxisync_client::config::ClientConfig;
use praxisync_client::error::{ClientError, ClientResult};
use praxisync_client::socket::SocketClient;
use praxisync_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = match cli.command {
        Command::Serve => TracingConfig::daemon(),
        _ if cli.debug => TracingConfig::cli_debug(),
        _ => TracingConfig::default().with_level(tracing::Level::WARN),
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: failed to initialize tracing: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };

    if let Command::Serve = cli.command {
        return commands::serve(&config).await;
    }

    let socket_path = cli
        .socket_path
        .clone()
        .unwrap_or_else(|| config.socket_path());
    let client = SocketClient::new(socket_path, Duration::from_secs(cli.timeout.max(1)));

    match cli.command {
        Command::Serve => unreachable!("handled above"),
        Command::Sync { from, to } => {
            commands::sync(&client, &config, from, to, cli.json).await
        }
        Command::Events { from, to } => {
            commands::events(&client, &config, from, to, cli.json).await
        }
        Command::Create {
            title,
            start,
            end,
            location,
            description,
            notes,
            action_items,
        } => {
            commands::create(
                &client,
                title,
                start,
                end,
                location,
                description,
                notes,
                action_items,
                cli.json,
            )
            .await
        }
        Command::Patch {
            source,
            id,
            title,
            description,
            location,
            start,
            end,
            notes,
            action_items,
        } => {
            commands::patch(
                &client,
                source,
                id,
                title,
                description,
                location,
                start,
                end,
                notes,
                action_items,
                cli.json,
            )
            .await
        }
        Command::Status => commands::status(&client, cli.json).await,
        Command::Ping => commands::ping(&client).await,
        Command::Shutdown => commands::shutdown(&client).await,
    }
}
