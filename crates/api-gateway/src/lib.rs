//! API Gateway - HTTP and WebSocket interface of the ordering backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            API GATEWAY                               │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐                 │
//! │  │ Public REST │   │ Admin REST  │   │  WebSocket  │                 │
//! │  │ menu/orders │   │ /api/admin  │   │     /ws     │                 │
//! │  └──────┬──────┘   └──────┬──────┘   └──────┬──────┘                 │
//! │         │                 │                 │                        │
//! │  ┌──────┴─────────────────┴──────┐   ┌──────┴──────────────┐         │
//! │  │ Tracing → CORS → body limit   │   │ ConnectionSession   │         │
//! │  │ RateLimit (orders), Auth      │   │ read / write loops  │         │
//! │  └──────────────┬────────────────┘   └──────┬──────────────┘         │
//! │                 │                           │                        │
//! │  ┌──────────────┴────────────────┐          │ subscribe              │
//! │  │ Order/Menu/Page/Params service│          │                        │
//! │  └──────┬───────────────┬────────┘          │                        │
//! │         │ ports         │ ChangeNotifier    │                        │
//! └─────────┼───────────────┼───────────────────┼────────────────────────┘
//!           ▼               ▼                   │
//!     repositories    NotificationBus ◀─────────┘
//! ```
//!
//! # Channels
//!
//! - `global`: every WebSocket client
//! - `admin`: clients presenting the admin token; receives `orders_changed`
//!   and `menu_changed`
//!
//! # Usage
//!
//! ```ignore
//! use api_gateway::{ApiGatewayService, DomainServices, GatewayConfig};
//!
//! let services = DomainServices { orders, menu, pages, params };
//! let mut service = ApiGatewayService::new(config, bus, services, shutdown)?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod service;
pub mod ws;

// Re-exports for public API
pub use adapters::{
    InMemoryMenuRepository, InMemoryOrderRepository, InMemoryPageRepository,
    InMemoryParamsRepository,
};
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, ApiResult, GatewayError, ServiceError};
pub use domain::menu::{GroupInput, MenuService, ProductInput};
pub use domain::orders::OrderService;
pub use domain::pages::{Page, PageElement, PageService};
pub use domain::params::{HeaderInput, ParamsService, SiteParams};
pub use middleware::RateLimiter;
pub use ports::{MenuRepository, OrderRepository, PageRepository, ParamsRepository};
pub use router::{build_router, AppState};
pub use service::{ApiGatewayService, DomainServices};
pub use ws::{CloseReason, ConnectionSession, SessionConfig, SessionState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
