//! # Error Types
//!
//! Errors raised while interpreting entity values.

use thiserror::Error;

/// Errors produced when parsing entity fields from external input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Order status string is not one of `open`, `finished`, `cancelled`.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
