//! beconfig CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use beconfig_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use clap::{Parser, Subcommand};

/// beconfig - BackendConfig validation
#[derive(Parser, Debug)]
#[command(name = "beconfig")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate BackendConfig manifests and resolve their IAP credentials
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Install the tracing subscriber (filtered by `RUST_LOG`)
    pub fn init_logging(&self) -> Result<()> {
        let format = if self.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Text
        };
        init_telemetry(TelemetryConfig {
            format,
            default_filter: Some("warn,beconfig=info".to_string()),
        })
        .map_err(|e| Error::command_failed(e.to_string()))
    }

    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Validate(args) => commands::validate::run(args).await,
        }
    }
}
