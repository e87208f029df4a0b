//! rutas-proxy entry point.
//!
//! Boots the cache controller for the configured site and serves it over
//! HTTP. Logs are JSON on stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use rutas_client::{CacheController, FetchClient, FetchConfig, Network};
use rutas_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod server;

use server::{ServerState, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        origin = %config.origin,
        version = %config.cache_version,
        db = %config.db_path.display(),
        "starting rutas-proxy"
    );

    let db = CacheDb::open(&config.db_path).await.context("failed to open cache database")?;
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let controller = CacheController::from_config(db, network, &config)?;

    match controller.register().await {
        Ok(status) => tracing::info!(state = %status.state, controlling = status.controlling, "cache controller ready"),
        Err(e) => tracing::warn!(error = %e, "cache install failed; serving pass-through until next start"),
    }

    let state: SharedState = Arc::new(ServerState::new(controller));
    let shutdown_state = state.clone();

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, server::create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    shutdown_state.controller.wait_until_idle().await;

    Ok(())
}
