//! Configuration management for Zyph
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, ZyphError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Zyph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Local persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Retry queue schedule
    #[serde(default)]
    pub sync: SyncConfig,
    /// Page capture and monitoring behavior
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Knowledge-base backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root URL of the REST API, including the version prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,

    /// How long a folder listing is served from memory (seconds)
    #[serde(default = "default_folder_cache_ttl")]
    pub folder_cache_ttl_seconds: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_folder_cache_ttl() -> u64 {
    300
}

fn default_user_agent() -> String {
    format!("zyph/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_api_timeout(),
            folder_cache_ttl_seconds: default_folder_cache_ttl(),
            user_agent: default_user_agent(),
        }
    }
}

/// Which key-value backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map, lost on exit
    Memory,
    /// Embedded sled database
    #[default]
    Sled,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sled" => Ok(StorageBackend::Sled),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend type
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database path; the platform data directory when unset
    #[serde(default)]
    pub path: Option<String>,
}

/// Sync queue retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay after the first failure (seconds)
    #[serde(default = "default_base_delay")]
    pub base_delay_seconds: u64,

    /// Upper bound for the doubling delay (seconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_seconds: u64,

    /// Attempts before an item is parked
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How often the alarm processes the queue (seconds)
    #[serde(default = "default_alarm_interval")]
    pub alarm_interval_seconds: u64,
}

fn default_base_delay() -> u64 {
    30
}

fn default_max_delay() -> u64 {
    3600
}

fn default_max_attempts() -> u32 {
    8
}

fn default_alarm_interval() -> u64 {
    60
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_delay_seconds: default_base_delay(),
            max_delay_seconds: default_max_delay(),
            max_attempts: default_max_attempts(),
            alarm_interval_seconds: default_alarm_interval(),
        }
    }
}

/// Capture and monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Lifetime of the restricted-page banner (milliseconds)
    #[serde(default = "default_warning_dismiss")]
    pub warning_dismiss_ms: u64,

    /// Lifetime of the "context added" toast (milliseconds)
    #[serde(default = "default_toast")]
    pub toast_ms: u64,

    /// Inactivity after which a monitored conversation ends (seconds)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

fn default_warning_dismiss() -> u64 {
    5000
}

fn default_toast() -> u64 {
    3000
}

fn default_idle_timeout() -> u64 {
    300
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            warning_dismiss_ms: default_warning_dismiss(),
            toast_ms: default_toast(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment and CLI
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. Environment variables (`ZYPH_*`) override the file, and CLI
    /// flags override both.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use zyph::cli::Cli;
    /// use zyph::config::Config;
    /// use clap::Parser;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let cli = Cli::parse_from(["zyph", "logout"]);
    /// let config = Config::load("config/config.yaml", &cli)?;
    /// config.validate()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ZyphError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ZyphError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("ZYPH_API_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("ZYPH_API_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid ZYPH_API_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(ttl) = std::env::var("ZYPH_FOLDER_CACHE_TTL_SECONDS") {
            if let Ok(value) = ttl.parse() {
                self.api.folder_cache_ttl_seconds = value;
            } else {
                tracing::warn!("Invalid ZYPH_FOLDER_CACHE_TTL_SECONDS: {}", ttl);
            }
        }

        if let Ok(backend) = std::env::var("ZYPH_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(value) => self.storage.backend = value,
                Err(e) => tracing::warn!("Invalid ZYPH_STORAGE_BACKEND: {}", e),
            }
        }

        if let Ok(path) = std::env::var("ZYPH_STORE_PATH") {
            self.storage.path = Some(path);
        }

        if let Ok(attempts) = std::env::var("ZYPH_SYNC_MAX_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(v) => {
                    self.sync.max_attempts = v;
                    tracing::debug!(max_attempts = v, "Env override: ZYPH_SYNC_MAX_ATTEMPTS");
                }
                Err(_) => tracing::warn!("Invalid ZYPH_SYNC_MAX_ATTEMPTS: {}", attempts),
            }
        }

        if let Ok(interval) = std::env::var("ZYPH_SYNC_INTERVAL_SECONDS") {
            match interval.parse::<u64>() {
                Ok(v) => {
                    self.sync.alarm_interval_seconds = v;
                    tracing::debug!(interval = v, "Env override: ZYPH_SYNC_INTERVAL_SECONDS");
                }
                Err(_) => tracing::warn!("Invalid ZYPH_SYNC_INTERVAL_SECONDS: {}", interval),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(path) = &cli.store_path {
            self.storage.path = Some(path.clone());
        }
        if cli.memory {
            self.storage.backend = StorageBackend::Memory;
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ZyphError::Config` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(ZyphError::Config(format!(
                "api.base_url is not a valid URL: {}",
                self.api.base_url
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(ZyphError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sync.base_delay_seconds == 0 {
            return Err(ZyphError::Config(
                "sync.base_delay_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sync.max_delay_seconds < self.sync.base_delay_seconds {
            return Err(ZyphError::Config(
                "sync.max_delay_seconds must be at least sync.base_delay_seconds".to_string(),
            )
            .into());
        }

        if self.sync.max_attempts == 0 {
            return Err(ZyphError::Config(
                "sync.max_attempts must be greater than 0".to_string(),
            )
            .into());
        }

        if self.sync.alarm_interval_seconds == 0 {
            return Err(ZyphError::Config(
                "sync.alarm_interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.capture.idle_timeout_seconds == 0 {
            return Err(ZyphError::Config(
                "capture.idle_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.api.folder_cache_ttl_seconds, 300);
        assert_eq!(config.storage.backend, StorageBackend::Sled);
        assert_eq!(config.sync.max_attempts, 8);
        assert_eq!(config.capture.warning_dismiss_ms, 5000);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_delays() {
        let mut config = Config::default();
        config.sync.max_delay_seconds = 10;
        config.sync.base_delay_seconds = 20;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sync.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: https://kb.example.com/api/v1
  folder_cache_ttl_seconds: 60
storage:
  backend: memory
sync:
  max_attempts: 3
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://kb.example.com/api/v1");
        assert_eq!(config.api.folder_cache_ttl_seconds, 60);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.sync.max_attempts, 3);
        assert_eq!(config.sync.base_delay_seconds, 30);
        assert_eq!(config.capture.toast_ms, 3000);
    }

    #[test]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = Cli::try_parse_from(["zyph", "logout"]).unwrap();
        let config = Config::load("/nonexistent/zyph.yaml", &cli).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::try_parse_from([
            "zyph",
            "--api-url",
            "http://127.0.0.1:9999",
            "--memory",
            "logout",
        ])
        .unwrap();
        let mut config = Config::default();
        config.apply_cli_overrides(&cli);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("Memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
