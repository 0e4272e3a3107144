//! Gacha bet-resolution server
//!
//! Places bets on the ledger, reconciles their asynchronous resolutions into
//! a local event store and serves bet status over HTTP.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, Overrides};
use gacha_core::processors::ResolutionListener;
use gacha_core::store::EventStore;
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Gacha - bet placement and resolution tracking
#[derive(Parser, Debug)]
#[command(name = "gacha-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./gacha-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override whether bets are force-resolved right after placement
    #[arg(long, env = "GACHA_FORCE_RESOLVE")]
    force_resolve: Option<bool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting gacha-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(
        &args.config,
        Overrides {
            listen: args.listen,
            force_resolve: args.force_resolve,
        },
    ));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Open the event store; a malformed store must not be silently reset
    let store = Arc::new(EventStore::open(&loaded_config.store_path).await.map_err(|e| {
        tracing::error!("Failed to open event store: {}", e);
        e
    })?);

    let gateway = loaded_config.ledger.build_gateway().map_err(|e| {
        tracing::error!("Failed to build ledger gateway: {}", e);
        e
    })?;
    tracing::info!(gateway = gateway.name(), "Ledger gateway ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Without a live subscription no bet would ever resolve, so do not serve
    let listener = ResolutionListener::new(store.clone(), shutdown_rx.clone())
        .start(&*gateway)
        .await
        .map_err(|e| {
            tracing::error!("Failed to start resolution listener: {}", e);
            e
        })?;

    // Create application state
    let state = AppState::new(store, gateway, loaded_config.bet, listener.state.clone());

    // Spawn config reload handler (listens for SIGHUP)
    spawn_config_reload_handler(state.clone(), config_loader, shutdown_rx);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_tx.clone()).await;

    // Stop background tasks even if the server failed to start
    let _ = shutdown_tx.send(true);
    if let Err(e) = listener.join.await {
        tracing::error!("Resolution listener task failed: {}", e);
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gacha_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
