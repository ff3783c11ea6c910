//! Layered configuration
//!
//! Values are resolved in this order, later sources winning:
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config sikv.toml`)
//! 3. `SIKV_*` environment variables, nested with `__`
//!    (e.g. `SIKV_TABLE__VALUE_TYPE=int32`, `SIKV_SERVER__BIND=0.0.0.0:8007`)
//! 4. Command-line overrides applied by the binary

use crate::error::{Error, Result};
use crate::storage::pool::DEFAULT_ARENA_SIZE;
use crate::storage::ValueType;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default initial capacity of the slot array
pub const DEFAULT_CAPACITY: usize = 4;
/// Default load factor threshold
pub const DEFAULT_LOAD_FACTOR: f64 = 0.85;
/// Default capacity multiplier on resize
pub const DEFAULT_RESIZE_POLICY: usize = 2;
/// Default ceiling on the slot array size (1 GiB)
pub const DEFAULT_MAX_TABLE_BYTES: usize = 1 << 30;
/// Default listening port
pub const DEFAULT_PORT: u16 = 8007;
/// Default maximum length of one command line
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024;

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub table: TableConfig,
    pub logging: LoggingConfig,
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind: SocketAddr,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Longest accepted command line, newline included
    pub max_line_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_connections: 1024,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Hash table configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Initial number of slots (power of two)
    pub initial_capacity: usize,
    /// Resize once the next insert would push `len / capacity` past this
    pub load_factor: f64,
    /// Capacity multiplier applied on resize (power of two)
    pub resize_policy: usize,
    /// Hard ceiling on the slot array size in bytes
    pub max_table_bytes: usize,
    /// Declared type of every value in the table
    pub value_type: ValueType,
    /// Hash seed
    pub seed: u32,
    pub pool: PoolConfig,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
            resize_policy: DEFAULT_RESIZE_POLICY,
            max_table_bytes: DEFAULT_MAX_TABLE_BYTES,
            value_type: ValueType::String,
            seed: crate::storage::hash::DEFAULT_SEED,
            pool: PoolConfig::default(),
        }
    }
}

/// Payload pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Carve payloads from arenas instead of the global allocator
    pub enabled: bool,
    /// Size of each arena in bytes
    pub arena_size: usize,
    /// Optional ceiling on total arena bytes
    pub max_bytes: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            arena_size: DEFAULT_ARENA_SIZE,
            max_bytes: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level directive (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for daily rolling log files
    pub directory: Option<PathBuf>,
    /// Colored console output
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            ansi: true,
        }
    }
}

impl Config {
    /// Load defaults, then `path` (if given), then `SIKV_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::load_layers(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`] but without validation, so callers can apply
    /// further overrides before validating once
    pub fn load_layers(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SIKV")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.table.validate()?;
        if self.server.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "server.max_connections must be at least 1".into(),
            ));
        }
        if self.server.max_line_bytes < 2 {
            return Err(Error::InvalidConfig(
                "server.max_line_bytes must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 || !self.initial_capacity.is_power_of_two() {
            return Err(Error::InvalidCapacity(self.initial_capacity));
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "table.load_factor must be in (0, 1], got {}",
                self.load_factor
            )));
        }
        validate_resize_policy(self.resize_policy)?;
        if self.pool.arena_size == 0 {
            return Err(Error::InvalidConfig(
                "table.pool.arena_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A resize multiplier must keep the capacity a power of two
pub(crate) fn validate_resize_policy(policy: usize) -> Result<()> {
    if policy < 2 || !policy.is_power_of_two() {
        return Err(Error::InvalidConfig(format!(
            "resize policy must be a power of two >= 2, got {}",
            policy
        )));
    }
    Ok(())
}
