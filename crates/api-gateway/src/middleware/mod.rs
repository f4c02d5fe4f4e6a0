//! Middleware stack for the API Gateway.
//!
//! Layer order: Request → Tracing → CORS → body limit → Handler, with
//! `RateLimit` on order creation and `Auth` on the admin routes.

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod tracing;

pub use auth::{constant_time_compare, AdminAuth, AuthLayer};
pub use cors::create_cors_layer;
pub use rate_limit::{
    extract_client_ip, RateLimitError, RateLimitLayer, RateLimiter, RateRule, Scope,
    ALERT_SUPPRESSION,
};
pub use tracing::TracingLayer;
