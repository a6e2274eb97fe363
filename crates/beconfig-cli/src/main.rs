//! beconfig CLI
//!
//! Validates BackendConfig manifests before they are applied.

use clap::Parser;

use beconfig_cli::{Cli, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging()?;
    cli.run().await
}
