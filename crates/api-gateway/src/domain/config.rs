//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// How long to wait for in-flight requests on shutdown
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// HTTP server configuration
    pub http: HttpConfig,
    /// WebSocket session configuration
    pub websocket: WebSocketConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Admin access configuration
    pub admin: AdminConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(10),
            http: HttpConfig::default(),
            websocket: WebSocketConfig::default(),
            rate_limit: RateLimitConfig::default(),
            admin: AdminConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.max_body_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_body_size cannot be 0".into(),
            ));
        }

        // Validate websocket session settings
        if self.websocket.queue_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "queue_capacity cannot be 0".into(),
            ));
        }
        for (name, value) in [
            ("read_timeout", self.websocket.read_timeout),
            ("write_timeout", self.websocket.write_timeout),
            ("dedup_ttl", self.websocket.dedup_ttl),
            ("sweep_interval", self.websocket.sweep_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout(format!("{name} cannot be 0")));
            }
        }

        // Validate rate limits
        if self.rate_limit.enabled {
            if self.rate_limit.create_order_per_minute == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "create_order_per_minute cannot be 0".into(),
                ));
            }
            if self.rate_limit.orders_per_second == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "orders_per_second cannot be 0".into(),
                ));
            }
        }

        if let Some(token) = &self.admin.token {
            if token.len() < MIN_ADMIN_TOKEN_LEN {
                return Err(ConfigError::Invalid(format!(
                    "admin token must be at least {MIN_ADMIN_TOKEN_LEN} characters"
                )));
            }
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// Shortest accepted admin token.
pub const MIN_ADMIN_TOKEN_LEN: usize = 16;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            max_body_size: 64 * 1024,
        }
    }
}

/// WebSocket session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Outbound queue capacity per connection
    pub queue_capacity: usize,
    /// How long a delivered message id suppresses duplicates
    #[serde(with = "humantime_serde")]
    pub dedup_ttl: Duration,
    /// Max silence from the client before the session is closed
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Max time a single frame write may take
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
    /// Dedup cache sweep interval
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            queue_capacity: shared_bus::DEFAULT_QUEUE_CAPACITY,
            dedup_ttl: shared_bus::DEFAULT_DEDUP_TTL,
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(60),
            sweep_interval: shared_bus::DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Orders a single IP may place per minute
    pub create_order_per_minute: u32,
    /// Orders accepted per second across all clients
    pub orders_per_second: u32,
    /// How often idle buckets are swept
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            create_order_per_minute: 5,
            orders_per_second: 20,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Admin access configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required for admin routes and the admin channel.
    /// `None` disables admin access entirely.
    pub token: Option<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Max age for preflight cache, in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            max_age: 3600,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config: {0}")]
    Io(String),
    /// Config file is not valid TOML for this schema
    #[error("cannot parse config: {0}")]
    Parse(String),
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before the single-letter suffixes
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
