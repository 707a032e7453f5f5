//! Attestor node entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use node_runtime::NodeRuntime;
use shared_types::NodeConfig;

/// Decentralized oracle node.
#[derive(Debug, Parser)]
#[command(name = "attestor-node", version, about)]
struct Cli {
    /// Path to the node config (YAML preferred, JSON accepted).
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = NodeConfig::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let level = if config.log_level.is_empty() {
        "info"
    } else {
        &config.log_level
    };
    attestor_telemetry::init_tracing(level).context("initializing tracing")?;

    info!(
        node_id = %config.id,
        primary = config.primary,
        peers = config.peers.len(),
        quorum = config.min_signatures_required,
        "Attestor node booting"
    );

    // Concrete plugins and listeners are registered by embedding
    // applications; the stock binary serves the protocol surfaces only.
    let runtime = NodeRuntime::new(config);
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // In-flight tasks are abandoned; the downstream chain's duplicate
    // detection absorbs any replays after restart.
    info!("Shutdown complete.");
    Ok(())
}
