//! Application configuration types
//!
//! Defines the structure for configuration files.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::command::{
    DEFAULT_EXTERNAL_COMMANDS_FILE, DEFAULT_QUEUE_CAPACITY, DEFAULT_RETRY_INTERVAL, MAX_QUEUE_CAPACITY,
    WriterConfig,
};
use crate::statusdata::{DEFAULT_REFRESH_INTERVAL, DEFAULT_STATUS_FILE, RepositoryOptions};
use crate::xdata::DecoderOptions;

/// Errors that can occur during configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address
    pub addr: SocketAddr,

    /// Cross-origin resource sharing
    pub cors: CorsConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration; the layer is only installed when enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,

    /// Allowed origins, `*` for any
    pub allowed_origins: Vec<String>,

    pub allowed_methods: Vec<String>,

    pub allowed_headers: Vec<String>,

    pub allow_credentials: bool,

    /// How long browsers may cache a preflight response
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: ["Accept", "Authorization", "Content-Type", "X-CSRF-Token"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            allow_credentials: false,
            max_age: Duration::from_secs(300),
        }
    }
}

impl CorsConfig {
    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Nagios integration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NagiosConfig {
    /// Path to `status.dat`
    pub status_file: PathBuf,

    /// Reload the status file in the background
    pub reload_status_file: bool,

    /// Interval between background reloads
    #[serde(with = "humantime_serde")]
    pub reload_interval: Duration,

    /// Keep decoding when a value has the wrong type
    pub ignore_invalid_types: bool,

    /// Keep decoding when a line is malformed
    pub ignore_invalid_lines: bool,

    /// Path to the external command file (named pipe)
    pub external_commands_file: PathBuf,

    /// Maximum number of queued commands
    pub queue_capacity: usize,

    /// Reject submissions when the queue is full instead of waiting
    pub non_blocking: bool,

    /// Pause after a failed open or write of the command file
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl Default for NagiosConfig {
    fn default() -> Self {
        Self {
            status_file: PathBuf::from(DEFAULT_STATUS_FILE),
            reload_status_file: true,
            reload_interval: DEFAULT_REFRESH_INTERVAL,
            ignore_invalid_types: false,
            ignore_invalid_lines: false,
            external_commands_file: PathBuf::from(DEFAULT_EXTERNAL_COMMANDS_FILE),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            non_blocking: true,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP API configuration
    pub api: ApiConfig,

    /// Nagios paths, reloading and command queue
    pub nagios: NagiosConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Generate a default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check values that parse but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nagios = &self.nagios;
        if nagios.status_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("nagios.status_file is empty".to_string()));
        }
        if nagios.external_commands_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "nagios.external_commands_file is empty".to_string(),
            ));
        }
        if nagios.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "nagios.queue_capacity must be at least 1".to_string(),
            ));
        }
        if nagios.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "nagios.queue_capacity must be at most {}",
                MAX_QUEUE_CAPACITY
            )));
        }
        if nagios.reload_status_file && nagios.reload_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "nagios.reload_interval must be positive".to_string(),
            ));
        }
        if nagios.retry_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "nagios.retry_interval must be positive".to_string(),
            ));
        }

        let cors = &self.api.cors;
        if cors.enabled && cors.allow_credentials && cors.allows_any_origin() {
            return Err(ConfigError::Invalid(
                "api.cors.allow_credentials cannot be combined with a '*' origin".to_string(),
            ));
        }
        Ok(())
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            ignore_invalid_types: self.nagios.ignore_invalid_types,
            ignore_invalid_lines: self.nagios.ignore_invalid_lines,
        }
    }

    pub fn repository_options(&self) -> RepositoryOptions {
        RepositoryOptions {
            decoder: self.decoder_options(),
        }
    }

    pub fn writer_config(&self) -> WriterConfig {
        WriterConfig {
            capacity: self.nagios.queue_capacity,
            non_blocking: self.nagios.non_blocking,
            retry_interval: self.nagios.retry_interval,
        }
    }
}
