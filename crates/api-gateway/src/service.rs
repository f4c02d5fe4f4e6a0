//! API Gateway service: binds the HTTP listener and runs it until shutdown.

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::domain::menu::MenuService;
use crate::domain::orders::OrderService;
use crate::domain::pages::PageService;
use crate::domain::params::{ParamsService, HEADER_EXPIRY_INTERVAL};
use crate::middleware::{AdminAuth, RateLimiter};
use crate::router::{build_router, AppState};
use crate::ws::SessionConfig;
use axum::Router;
use shared_bus::NotificationBus;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Domain services the routes dispatch to.
#[derive(Clone)]
pub struct DomainServices {
    pub orders: OrderService,
    pub menu: MenuService,
    pub pages: PageService,
    pub params: ParamsService,
}

/// API Gateway service state
pub struct ApiGatewayService {
    config: GatewayConfig,
    state: AppState,
    limiter: Arc<RateLimiter>,
    shutdown: CancellationToken,
    started: bool,
}

impl ApiGatewayService {
    /// Create a new API Gateway service.
    ///
    /// Cancelling `shutdown` stops the server and closes every WebSocket
    /// session.
    pub fn new(
        config: GatewayConfig,
        bus: Arc<NotificationBus>,
        services: DomainServices,
        shutdown: CancellationToken,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let DomainServices {
            orders,
            menu,
            pages,
            params,
        } = services;
        let state = AppState {
            orders,
            menu,
            pages,
            params,
            bus,
            auth: AdminAuth::new(config.admin.token.clone()),
            session: SessionConfig::from(&config.websocket),
            shutdown: shutdown.clone(),
        };

        Ok(Self {
            config,
            state,
            limiter: Arc::new(RateLimiter::new()),
            shutdown,
            started: false,
        })
    }

    /// Router with all routes and middleware, without a listener.
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config, Arc::clone(&self.limiter))
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    ///
    /// After the shutdown token fires, in-flight requests get
    /// `shutdown_timeout` to finish.
    pub async fn serve(&mut self, listener: TcpListener) -> Result<(), GatewayError> {
        if self.started {
            return Err(GatewayError::AlreadyStarted);
        }
        self.started = true;

        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        if self.config.rate_limit.enabled {
            self.limiter
                .start_sweeping(self.config.rate_limit.sweep_interval);
        }
        let header_expiry = self.shutdown.child_token();
        tokio::spawn(
            self.state
                .params
                .clone()
                .run_header_expiry(HEADER_EXPIRY_INTERVAL, header_expiry.clone()),
        );

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let graceful = self.shutdown.clone().cancelled_owned();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(graceful)
                .await
        });
        info!(addr = %addr, "API Gateway listening");

        let finished = tokio::select! {
            _ = self.shutdown.cancelled() => None,
            joined = &mut server => Some(joined),
        };

        let result = match finished {
            Some(joined) => {
                // Server ended without a shutdown request
                let result = server_result(joined);
                if let Err(e) = &result {
                    error!(error = %e, "HTTP server error");
                }
                self.shutdown.cancel();
                result
            }
            None => {
                info!("Received shutdown signal");
                match timeout(self.config.shutdown_timeout, &mut server).await {
                    Ok(joined) => server_result(joined),
                    Err(_) => {
                        warn!(
                            timeout = ?self.config.shutdown_timeout,
                            "Graceful shutdown timed out, aborting server"
                        );
                        server.abort();
                        Err(GatewayError::ShutdownTimeout(self.config.shutdown_timeout))
                    }
                }
            }
        };

        self.limiter.stop_sweeping();
        header_expiry.cancel();
        info!("API Gateway stopped");
        result
    }
}

fn server_result(joined: Result<std::io::Result<()>, JoinError>) -> Result<(), GatewayError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(GatewayError::Internal(format!("server error: {e}"))),
        Err(e) => Err(GatewayError::Internal(format!("server task failed: {e}"))),
    }
}
