//! # Service Container
//!
//! Builds the shared notification bus, the repositories and the services
//! that depend on them, and hands them to the gateway.
//!
//! ## Wiring
//!
//! ```text
//! NotificationBus ◀── ChangeNotifier ◀── OrderService ──▶ OrderRepository
//!        │                          └─── MenuService  ──▶ MenuRepository
//!        └──▶ WebSocket sessions (subscribe)
//! ```

pub mod config;
pub mod services;

pub use config::{ConfigError, NodeConfig, SeedConfig};
pub use services::ServiceContainer;
