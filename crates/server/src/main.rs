//! portal-offline MCP server entry point.
//!
//! Boots the offline worker host and serves it as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use portal_client::Host;
use portal_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(db = %config.db_path.display(), origin = %config.origin, "Starting portal-offline server on stdio transport");

    let host = Arc::new(Host::open(config).await?);

    if host.restore().await? {
        tracing::info!("restored active worker from store");
    }

    // No-op when the configured version is already active.
    match host.registration().register(host.worker(None)?).await {
        Ok(outcome) => tracing::info!(?outcome, "worker registered"),
        Err(e) => tracing::warn!(error = %e, "worker install failed"),
    }

    let handler = handler::PortalServer::new(host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
