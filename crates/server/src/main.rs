//! swcache server entry point.
//!
//! Loads configuration, opens Cache Storage, loads the page (which registers
//! the worker) and serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod site;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, cache = %config.cache_name(), "Starting swcache server on stdio transport");

    let site = site::Site::open(config).await?;
    let handler = handler::SwcacheServer::new(site);
    let transport = stdio();
    let server = serve_server(handler.clone(), transport).await?;

    server.waiting().await?;
    handler.site().shutdown().await;

    Ok(())
}
