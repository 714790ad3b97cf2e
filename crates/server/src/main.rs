//! swcache server entry point.
//!
//! Boots the offline worker for the configured app version, then serves MCP
//! on stdio so a client can drive fetches and messages through it.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig, Network, OfflineWorker, Registration, WorkerConfig};
use swcache_core::{AppConfig, CacheDb};
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
    let worker_config = WorkerConfig::from_app_config(&config)?;
    let cache = CacheDb::open(&config.db_path).await?;

    let network: Arc<dyn Network> =
        Arc::new(FetchClient::new(FetchConfig::from(&config), worker_config.scope.clone())?);
    let registration = Registration::new(network.clone());
    let worker = Arc::new(OfflineWorker::new(worker_config.clone(), cache.clone(), network));
    log_state_changes(&worker);

    let outcome = registration.register(worker).await?;
    tracing::info!(
        version = %worker_config.version_id,
        scope = %worker_config.scope,
        state = %outcome.state,
        cached = ?outcome.cached,
        "Starting swcache server on stdio transport"
    );

    let host = handler::WorkerHost { registration, cache, config: worker_config };
    let handler = handler::SwCacheServer::new(host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Log every lifecycle transition of `worker` until it is dropped.
fn log_state_changes(worker: &OfflineWorker) {
    let version = worker.version().to_string();
    let mut states = worker.lifecycle().subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            tracing::info!(%version, %state, "worker lifecycle changed");
        }
    });
}
