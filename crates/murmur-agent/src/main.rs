//! # Murmur Agent
//!
//! Runs on every cluster node. Owns the node's status string, serves the
//! control plane that `murmur status` talks to, and gossips the status to
//! peers so the whole cluster converges on it.
//!
//! ## Architecture
//! ```text
//! murmur CLI ──HTTP──▶ Agent ──UDP gossip──▶ Peers
//!                        ▲                      │
//!                        └──────UDP gossip──────┘
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cluster;
mod config;
mod routes;
mod state;

use config::AppConfig;
use state::AppState;

/// Murmur Agent - cluster membership node
#[derive(Parser, Debug)]
#[command(name = "murmur-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/murmur-agent.toml")]
    config: String,

    /// Control-plane listen address (overrides config)
    #[arg(long)]
    rpc_addr: Option<String>,

    /// Gossip UDP bind address (overrides config)
    #[arg(long)]
    gossip_addr: Option<String>,

    /// Peer gossip address, repeatable (overrides config)
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Node ID (overrides config)
    #[arg(long)]
    node_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    info!("Starting Murmur agent v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(&args.config, &args)?;
    info!(path = %args.config, "Configuration loaded");

    let rpc_addr = config.rpc_addr.clone();

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let state = AppState::new(config);
    info!(
        node_id = %state.gossip.node_id(),
        status = %state.status().status,
        "Node state initialized"
    );

    // Spawn gossip workers
    let gossip = state.gossip.clone();
    let receiver_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = gossip.run_receiver(receiver_shutdown).await {
            error!(error = %e, "Gossip receiver failed");
        }
    });

    let gossip = state.gossip.clone();
    let local_status = state.subscribe();
    let broadcaster_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = gossip.run_broadcaster(local_status, broadcaster_shutdown).await {
            error!(error = %e, "Gossip broadcaster failed");
        }
    });

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&rpc_addr)
        .await
        .with_context(|| format!("Failed to bind control plane on {rpc_addr}"))?;
    info!("Control plane listening on {}", rpc_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Agent shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
