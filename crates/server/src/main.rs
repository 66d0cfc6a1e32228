//! shellcache MCP server entry point.
//!
//! Loads configuration, opens the cache database, installs and activates the
//! configured generation, then serves tools on stdio. Logging goes to stderr
//! to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchConfig, HttpNetwork, Network};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod context;
mod error;
mod handler;
mod tools;

use context::ServerContext;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);

    let ctx = Arc::new(ServerContext::new(config, db, network));

    let registered = ctx.install_configured().await?;
    tracing::info!(
        generation = %registered.install.generation,
        cached = registered.install.cached.len(),
        failed = registered.install.failed.len(),
        "Starting shellcache server on stdio transport"
    );

    let handler = handler::ShellCacheServer::new(ctx.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    ctx.host().settle().await;

    Ok(())
}
