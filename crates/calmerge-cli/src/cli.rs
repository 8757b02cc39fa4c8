//! Command-line interface definition.

use std::path::PathBuf;

use calmerge_core::TracingOutputFormat;
use clap::{Parser, Subcommand};

/// calmerge - Many calendar feeds, one calendar
#[derive(Debug, Parser)]
#[command(name = "calmerge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALMERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long, default_value = "compact", value_parser = parse_log_format)]
    pub log_format: TracingOutputFormat,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the configuration file to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(calmerge_server::AppConfig::default_path)
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the aggregation server
    Serve {
        /// Port to listen on (overrides config and PORT)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

fn parse_log_format(s: &str) -> Result<TracingOutputFormat, String> {
    s.parse().map_err(|e: calmerge_core::TracingError| e.to_string())
}
