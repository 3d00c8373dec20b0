//! Layered configuration for the router.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (minisql.toml)
//! ```toml
//! [router]
//! coordinators = ["10.0.0.1:8081", "10.0.0.2:8081"]
//! resolution = "cached"
//!
//! [timeouts]
//! coordinator_ms = 1000
//!
//! [storage]
//! port = 9090
//! ```

mod defaults;

pub use defaults::*;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::NodeEndpoint;

/// Main configuration for a router session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Cluster entry points and resolution strategy
    pub router: ClusterConfig,
    /// Deadlines for every network round-trip
    pub timeouts: TimeoutConfig,
    /// Storage-node addressing
    pub storage: StorageConfig,
}

impl RouterConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - CLI overrides to apply on top
    pub fn load(config_path: Option<&str>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(RouterConfig::default()));

        // Layer 1: Config file (if provided)
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Layer 2: Environment variables with MINISQL_ prefix, `__` nests
        figment = figment.merge(Env::prefixed("MINISQL_").split("__"));

        // Layer 3: CLI overrides
        figment = figment.merge(Serialized::defaults(overrides));

        figment.extract().map_err(ConfigError::from)
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Parses the configured coordinator list, preserving order.
    pub fn coordinator_endpoints(&self) -> Result<Vec<NodeEndpoint>, ConfigError> {
        let endpoints = self
            .router
            .coordinators
            .iter()
            .filter(|addr| !addr.trim().is_empty())
            .map(|addr| addr.parse::<NodeEndpoint>().map_err(ConfigError::new))
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(ConfigError::new("no coordinators configured"));
        }
        Ok(endpoints)
    }
}

/// How a table's owning storage nodes are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Ask the coordinators for every statement
    Failover,
    /// Remember each table's owners and go straight to them
    #[default]
    Cached,
}

/// Cluster entry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Coordinator addresses, tried in this order (`http://` prefix optional)
    pub coordinators: Vec<String>,
    /// Node resolution strategy
    pub resolution: ResolutionMode,
    /// Number of status messages retained in the feed
    pub feed_capacity: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            coordinators: default_coordinators(),
            resolution: ResolutionMode::default(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

/// Network deadlines, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Delay before each coordinator request
    pub warmup_ms: u64,
    /// Hard deadline per coordinator attempt
    pub coordinator_ms: u64,
    /// Deadline per storage-node request
    pub storage_ms: u64,
    /// Deadline per catalog request
    pub catalog_ms: u64,
}

impl TimeoutConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn coordinator(&self) -> Duration {
        Duration::from_millis(self.coordinator_ms)
    }

    pub fn storage(&self) -> Duration {
        Duration::from_millis(self.storage_ms)
    }

    pub fn catalog(&self) -> Duration {
        Duration::from_millis(self.catalog_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            warmup_ms: DEFAULT_WARMUP_MS,
            coordinator_ms: DEFAULT_COORDINATOR_TIMEOUT_MS,
            storage_ms: DEFAULT_STORAGE_TIMEOUT_MS,
            catalog_ms: DEFAULT_CATALOG_TIMEOUT_MS,
        }
    }
}

/// Storage-node addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Port every storage node listens on
    pub port: u16,
    /// Use the port from the coordinator's host identifier instead of `port`
    pub keep_owner_port: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_STORAGE_PORT,
            keep_owner_port: false,
        }
    }
}

/// CLI overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<ClusterOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<TimeoutOverrides>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionMode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_ms: Option<u64>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
#[error("configuration error: {message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::new(e.to_string())
    }
}
