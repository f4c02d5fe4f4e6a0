//! Logging setup.
//!
//! Filter from `TANDOOR_LOG`, then `RUST_LOG`, then `info`. JSON output when
//! `TANDOOR_JSON_LOGS` is `true` or `1`.

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter directives, preferred over `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "TANDOOR_LOG";

/// Switch to JSON output.
pub const JSON_LOGS_ENV: &str = "TANDOOR_JSON_LOGS";

const DEFAULT_FILTER: &str = "info";

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {directives:?}: {message}")]
    Filter { directives: String, message: String },

    #[error("logging already initialized: {0}")]
    Init(String),
}

/// Resolved logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub json: bool,
}

impl LogSettings {
    /// Read settings with `env` as the environment lookup.
    pub fn from_env_with<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let filter = env(LOG_FILTER_ENV)
            .or_else(|| env("RUST_LOG"))
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let json = env(JSON_LOGS_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false);
        Self { filter, json }
    }

    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_new(&settings.filter).map_err(|e| LoggingError::Filter {
        directives: settings.filter.clone(),
        message: e.to_string(),
    })?;

    let fmt_layer = if settings.json {
        // JSON output for containers/production
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
