//! # Receipt Payment Service
//!
//! Runs the WebSocket payment gateway over the in-memory ledger.
//!
//! ```text
//! RUST_LOG=debug RP_PORT=9000 node-runtime
//! RP_CONFIG=payments.toml node-runtime
//! ```

use anyhow::{Context, Result};
use node_runtime::{load_config, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = load_config().context("failed to load configuration")?;

    // Create and start the node runtime
    let mut runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    // Keep the node running
    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    runtime.shutdown().await;

    Ok(())
}
