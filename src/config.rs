//! Configuration module
//!
//! Loaded from a TOML file (default `<config_dir>/ocpp-central/config.toml`,
//! overridable through `OCPP_CONFIG`). Every section and field is optional;
//! missing values fall back to the defaults below.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 9000
//! subprotocols = ["ocpp1.6"]
//!
//! [ocpp]
//! response_timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! format = "text"   # or "json"
//!
//! [metrics]
//! prometheus_port = 9100
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::connection::MAX_RESPONSE_TIMEOUT;
use crate::application::session::RegistryOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ocpp: OcppConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// `[server]` — WebSocket listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port, `0` picks an ephemeral port
    pub port: u16,
    /// Accepted sub-protocols in preference order
    pub subprotocols: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            subprotocols: vec!["ocpp1.6".to_string()],
        }
    }
}

/// `[ocpp]` — protocol behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcppConfig {
    /// How long a charge point has to answer an outbound call
    pub response_timeout_secs: u64,
}

impl Default for OcppConfig {
    fn default() -> Self {
        Self {
            response_timeout_secs: 30,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// `[metrics]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Port of the Prometheus scrape endpoint; disabled when absent
    pub prometheus_port: Option<u16>,
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = MAX_RESPONSE_TIMEOUT.as_secs();
        if !(1..=max).contains(&self.ocpp.response_timeout_secs) {
            return Err(ConfigError::Invalid {
                field: "ocpp.response_timeout_secs",
                reason: format!(
                    "{} is outside 1..={}",
                    self.ocpp.response_timeout_secs, max
                ),
            });
        }
        if self.server.subprotocols.is_empty() {
            return Err(ConfigError::Invalid {
                field: "server.subprotocols",
                reason: "at least one sub-protocol is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// `host:port` the WebSocket server binds to
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.ocpp.response_timeout_secs)
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            supported_protocols: self.server.subprotocols.clone(),
            response_timeout: self.response_timeout(),
        }
    }
}

/// `OCPP_CONFIG` if set, otherwise `<config_dir>/ocpp-central/config.toml`
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os("OCPP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocpp-central")
        .join("config.toml")
}
