//! # Tandoor Node
//!
//! Restaurant ordering backend: public menu, order intake, admin API and
//! live change notifications over WebSocket.
//!
//! Configuration: `TANDOOR_CONFIG` (TOML file), `TANDOOR_HTTP_PORT`,
//! `TANDOOR_ADMIN_TOKEN`. Logging: `TANDOOR_LOG`, `TANDOOR_JSON_LOGS`.

use anyhow::{Context, Result};
use tracing::{error, info};

use node_runtime::container::NodeConfig;
use node_runtime::logging::{init_logging, LogSettings};
use node_runtime::NodeRuntime;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&LogSettings::from_env()).context("Failed to initialize logging")?;

    let config = NodeConfig::load().context("Failed to load configuration")?;
    let mut runtime = NodeRuntime::new(config).context("Failed to build node")?;

    let shutdown = runtime.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
        }
        shutdown.cancel();
    });

    info!("Node is running. Press Ctrl+C to stop.");
    runtime.run().await.context("Node terminated with an error")?;

    Ok(())
}
