//! Domain types for the API Gateway.
//!
//! Configuration, errors, identifiers and the domain services.

pub mod config;
pub mod correlation;
pub mod error;
pub mod menu;
pub mod orders;
pub mod pages;
pub mod params;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig};
pub use correlation::{ConnectionId, RequestId};
pub use error::{ApiError, ApiResult, GatewayError, ServiceError};
pub use menu::{MenuService, ProductInput};
pub use orders::OrderService;
pub use pages::{Page, PageElement, PageService};
pub use params::{HeaderInput, ParamsService, SiteParams};
