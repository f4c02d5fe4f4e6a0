//! Gateway error types and their HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Error returned to HTTP clients as `{"error": "..."}` with a status code.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Error message
    pub message: String,
    /// Seconds until the client may retry (rate limiting only)
    pub retry_after: Option<u64>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Malformed or semantically invalid request
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, details)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("not found: {}", resource.into()),
        )
    }

    /// Resource already exists
    pub fn conflict(details: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, details)
    }

    /// Missing or invalid credentials
    pub fn unauthorized(details: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, details)
    }

    /// Too many requests
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "rate limit exceeded".into(),
            retry_after: Some(retry_after.as_secs().max(1)),
        }
    }

    /// Internal error. The details are logged, never returned.
    pub fn internal(details: impl Into<String>) -> Self {
        tracing::error!(details = %details.into(), "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = axum::Json(ErrorBody {
            error: &self.message,
        });
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised by the domain services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Input rejected by business rules
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Entity with the same id already exists
    #[error("{0} already exists")]
    Conflict(String),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => ApiError::bad_request(msg),
            ServiceError::NotFound(what) => ApiError::not_found(what),
            ServiceError::Conflict(what) => ApiError::conflict(format!("{what} already exists")),
            ServiceError::Storage(msg) => ApiError::internal(msg),
        }
    }
}

impl From<shared_types::EntityError> for ServiceError {
    fn from(e: shared_types::EntityError) -> Self {
        ServiceError::Validation(e.to_string())
    }
}

/// Gateway-level errors (not returned to clients)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Server already running
    #[error("gateway already started")]
    AlreadyStarted,

    /// Shutdown did not finish in time
    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
