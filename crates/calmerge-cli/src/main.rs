//! calmerge CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calmerge_cli::cli::{Cli, Command, ConfigAction};
use calmerge_cli::commands;
use calmerge_cli::error::{ClientError, ClientResult};
use calmerge_core::{TracingConfig, init_tracing};
use calmerge_server::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let tracing_config = if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::server()
    };
    if let Err(e) = init_tracing(tracing_config.with_format(cli.log_format)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    // Run the command
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config_path();

    if let Some(Command::Config {
        action: ConfigAction::Path,
    }) = cli.command
    {
        return commands::config::path(&config_path);
    }

    // A missing or invalid configuration is fatal
    let config = AppConfig::load_from(&config_path).map_err(ClientError::Config)?;

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        Some(Command::Serve { port }) => commands::serve::run(config, port).await,
        None => commands::serve::run(config, None).await,
    }
}
