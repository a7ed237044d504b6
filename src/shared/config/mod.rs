//! Sync configuration module
//!
//! Provides `SyncConfig`, loadable from a TOML file, overridable from the
//! environment and constructible through a builder.
//!
//! ```toml
//! server_url = "https://tasks.example.com"
//! batch_size = 5
//!
//! [retry]
//! max_attempts = 5
//! base_delay_ms = 1000
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

const ENV_SERVER_URL: &str = "TASKSYNC_SERVER_URL";
const ENV_API_TOKEN: &str = "TASKSYNC_API_TOKEN";
const ENV_DB_PATH: &str = "TASKSYNC_DB_PATH";
const ENV_OFFLINE: &str = "TASKSYNC_OFFLINE";

/// Retry/backoff settings as they appear in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the remote entity store
    pub server_url: String,
    /// Bearer token sent with every remote call
    pub api_token: Option<String>,
    /// Local database file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// Per-request timeout for remote calls
    pub request_timeout_secs: u64,
    pub retry: RetrySettings,
    /// Operations per pass; `None` drains the whole log in one pass
    pub batch_size: Option<usize>,
    /// Delay before the follow-up pass when operations remain
    pub reschedule_delay_secs: u64,
    /// Safety-net sync interval while online
    pub sync_interval_secs: u64,
    pub auto_sync: bool,
    /// Start in offline mode
    pub start_offline: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_token: None,
            database_path: None,
            request_timeout_secs: 30,
            retry: RetrySettings::default(),
            batch_size: Some(5),
            reschedule_delay_secs: 5,
            sync_interval_secs: 60,
            auto_sync: true,
            start_offline: false,
        }
    }
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply `TASKSYNC_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Ok(token) = std::env::var(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(path));
        }
        if std::env::var(ENV_OFFLINE).unwrap_or_default() == "1" {
            self.start_offline = true;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay_ms",
                message: "must not exceed retry.max_delay_ms".to_string(),
            });
        }
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync_interval_secs",
                message: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                message: "must be positive; omit it for full drain".to_string(),
            });
        }
        Ok(())
    }

    /// Get the full URL for an API path
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
            path.push("tasksync");
            path.push("local.db");
            path
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reschedule_delay(&self) -> Duration {
        Duration::from_secs(self.reschedule_delay_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(token.into());
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn reschedule_delay_secs(mut self, secs: u64) -> Self {
        self.config.reschedule_delay_secs = secs;
        self
    }

    pub fn sync_interval_secs(mut self, secs: u64) -> Self {
        self.config.sync_interval_secs = secs;
        self
    }

    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.config.auto_sync = enabled;
        self
    }

    pub fn start_offline(mut self, offline: bool) -> Self {
        self.config.start_offline = offline;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}
