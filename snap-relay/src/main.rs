//! snap-relay binary entry point.
//!
//! Usage:
//! ```bash
//! snap-relay --config relay.toml
//! PORT=9000 RELAY_API_KEY=secret RELAY_PERSIST=true snap-relay
//! ```

use anyhow::Context;
use blindsnap_relay::{build_router, Config, SnapshotRelay};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = get_config_path();
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    let bind = config.server.bind_address();

    tracing::info!(
        "snap-relay v{} starting (persistence: {}, api key: {})",
        env!("CARGO_PKG_VERSION"),
        if config.persistence.enabled { "on" } else { "off" },
        if config.auth.api_key.is_some() { "required" } else { "not set" }
    );

    // WAL replay finishes before the listener accepts anything
    let relay = Arc::new(
        SnapshotRelay::open(config)
            .await
            .context("failed to open snapshot store")?,
    );

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(relay))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("snap-relay stopped");
    Ok(())
}

fn get_config_path() -> Option<PathBuf> {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
