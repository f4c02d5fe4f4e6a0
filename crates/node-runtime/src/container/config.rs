//! # Node Configuration
//!
//! Unified configuration for the gateway and the runtime.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. TOML file at `$TANDOOR_CONFIG` (default `config.toml`); a missing file
//!    means defaults
//! 3. Environment overrides: `TANDOOR_HTTP_PORT`, `TANDOOR_ADMIN_TOKEN`

use api_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TANDOOR_CONFIG";

/// Environment override for the HTTP port.
pub const HTTP_PORT_ENV: &str = "TANDOOR_HTTP_PORT";

/// Environment override for the admin token.
pub const ADMIN_TOKEN_ENV: &str = "TANDOOR_ADMIN_TOKEN";

/// Config file used when `TANDOOR_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// API gateway configuration.
    pub gateway: GatewayConfig,
    /// Initial menu contents.
    pub seed: SeedConfig,
}

/// Where the initial menu comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Load the built-in demo menu when no menu file is given.
    pub demo_menu: bool,
    /// JSON file with a list of menus. Takes precedence over the demo menu.
    pub menu_file: Option<PathBuf>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            demo_menu: true,
            menu_file: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema.
    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// An environment override has an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    /// Gateway settings failed validation.
    #[error(transparent)]
    Gateway(#[from] api_gateway::domain::ConfigError),
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load using `env` as the environment lookup.
    pub fn load_with<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = env(CONFIG_PATH_ENV).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse `path`. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `TANDOOR_*` overrides.
    pub fn apply_env_overrides<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = env(HTTP_PORT_ENV) {
            self.gateway.http.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: HTTP_PORT_ENV,
                value: port.clone(),
            })?;
        }
        if let Some(token) = env(ADMIN_TOKEN_ENV) {
            let token = token.trim();
            self.gateway.admin.token = (!token.is_empty()).then(|| token.to_string());
        }
        Ok(())
    }

    /// Validate the combined configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        Ok(())
    }
}
