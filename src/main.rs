// =============================================================================
// Technical Gateway — Main Entry Point
// =============================================================================
//
// Serves technical-analysis bundles (RSI, MACD, EMA 20/50/200, key levels)
// computed from price history fetched on demand from the market-data
// provider. Nothing is cached or persisted: every request recomputes from a
// fresh series.
// =============================================================================

mod api;
mod bundle;
mod config;
mod indicators;
mod series;
mod state;
mod upstream;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{GatewayConfig, CONFIG_FILE};
use crate::state::GatewayState;
use crate::upstream::HistoryClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Technical Gateway starting up");

    let mut config = GatewayConfig::load(CONFIG_FILE).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        GatewayConfig::default()
    });
    config.apply_env_overrides();

    if config.upstream_url.is_empty() {
        warn!("no upstream URL configured (set GATEWAY_UPSTREAM_URL) — all fetches will fail");
    }

    info!(
        symbols = ?config.symbols,
        resolution = %config.resolution,
        bind_addr = %config.bind_addr,
        "gateway configured"
    );

    // ── 2. Upstream client ───────────────────────────────────────────────
    let history = HistoryClient::new(
        config.upstream_url.clone(),
        config.ca_cert.as_deref().map(Path::new),
    )?;

    // Startup probe: log-only, the gateway still serves if the provider is
    // down right now.
    match history.health().await {
        Ok(()) => info!("upstream provider reachable"),
        Err(e) => warn!(error = %e, "upstream health check failed"),
    }

    // ── 3. Shared state & API server ─────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(GatewayState::new(config, history));

    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind API server on {bind_addr}: {e}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 4. Serve until shutdown ──────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("shutdown signal received — stopping gracefully");
        })
        .await?;

    info!("Technical Gateway shut down complete.");
    Ok(())
}
