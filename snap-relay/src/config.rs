//! Configuration loading for snap-relay.
//!
//! Configuration is loaded from an optional TOML file, then overridden by
//! environment variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `PORT` | `server.port` |
//! | `RELAY_API_KEY` | `auth.api_key` (empty = unset) |
//! | `RELAY_PERSIST` | `persistence.enabled` (only `"true"` enables) |
//! | `WAL_FILE` | `persistence.wal_file` |

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration for snap-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Shared API key configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Write-ahead log configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Request and subscriber limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host (default: 0.0.0.0).
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port (default: 8787).
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Shared API key configuration.
#[derive(Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Key required on writes and subscriptions. `None` disables the check
    /// for those; admin endpoints stay locked.
    pub api_key: Option<String>,
}

// Don't leak the key in debug output
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Write-ahead log configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Append every stored snapshot to the WAL (default: false).
    #[serde(default)]
    pub enabled: bool,
    /// Path to the WAL file (default: relay-wal.jsonl).
    #[serde(default = "default_wal_file")]
    pub wal_file: PathBuf,
}

/// Request and subscriber limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes (default: 5 MiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Outbound frames queued per subscriber before drops (default: 64).
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_wal_file() -> PathBuf {
    PathBuf::from("relay-wal.jsonl")
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024 // 5 MiB
}

fn default_subscriber_buffer() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wal_file: default_wal_file(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from `path` if given (defaults otherwise), then apply process
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(key) = lookup("RELAY_API_KEY") {
            self.auth.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Some(persist) = lookup("RELAY_PERSIST") {
            self.persistence.enabled = persist == "true";
        }
        if let Some(wal) = lookup("WAL_FILE") {
            if !wal.is_empty() {
                self.persistence.wal_file = PathBuf::from(wal);
            }
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// An environment variable held an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}
