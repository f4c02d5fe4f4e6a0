//! # Node Runtime Library
//!
//! Wires the notification bus, repositories, services and the API gateway
//! into one process. The `main.rs` binary is a thin shell around
//! [`NodeRuntime`].
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment)
//! 2. Initialize logging
//! 3. Build the service container and load the initial menu
//! 4. Serve HTTP and WebSocket until the shutdown token fires

#![warn(clippy::all)]

pub mod container;
pub mod logging;
pub mod seed;

use std::sync::Arc;

use api_gateway::{ApiGatewayService, GatewayError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::container::{NodeConfig, ServiceContainer};
use crate::seed::SeedError;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to load initial menu: {0}")]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The node: container plus gateway, scoped by one shutdown token.
pub struct NodeRuntime {
    container: Arc<ServiceContainer>,
    gateway: ApiGatewayService,
    shutdown: CancellationToken,
}

impl NodeRuntime {
    /// Build all services. Nothing listens until [`run`](Self::run).
    pub fn new(config: NodeConfig) -> Result<Self, RuntimeError> {
        let shutdown = CancellationToken::new();
        let container = Arc::new(ServiceContainer::new(config)?);
        let gateway = ApiGatewayService::new(
            container.config.gateway.clone(),
            Arc::clone(&container.bus),
            container.services(),
            shutdown.clone(),
        )?;

        Ok(Self {
            container,
            gateway,
            shutdown,
        })
    }

    /// Serve until [`shutdown`](Self::shutdown) is triggered.
    pub async fn run(&mut self) -> Result<(), RuntimeError> {
        info!(
            version = api_gateway::VERSION,
            addr = %self.container.config.gateway.http_addr(),
            admin = self.container.config.gateway.admin.token.is_some(),
            "Starting node"
        );
        self.gateway.start().await?;
        info!("Node stopped");
        Ok(())
    }

    /// Token that stops the node when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.shutdown.cancel();
    }

    /// Get a reference to the service container.
    pub fn container(&self) -> Arc<ServiceContainer> {
        Arc::clone(&self.container)
    }
}
