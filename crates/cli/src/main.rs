//! portal-offline command-line host.
//!
//! Logs go to stderr; command output is JSON on stdout.

use anyhow::Result;
use clap::Parser;
use portal_client::Host;
use portal_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut config = AppConfig::load()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let host = Host::open(config).await?;
    host.restore().await?;

    let output = commands::run(&host, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
