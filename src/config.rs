//! Configuration management for Parley
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for Parley
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service connection settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Session synchronization behavior
    #[serde(default)]
    pub sync: SyncConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the assistant service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Session synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Period between session list refreshes (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Title given to sessions the client creates
    #[serde(default = "default_new_session_title")]
    pub new_session_title: String,

    /// Title shown for sessions whose stored title is blank
    #[serde(default = "default_fallback_title")]
    pub fallback_title: String,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_new_session_title() -> String {
    "New Chat".to_string()
}

fn default_fallback_title() -> String {
    "Chat".to_string()
}

impl SyncConfig {
    /// Polling period as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            new_session_title: default_new_session_title(),
            fallback_title: default_fallback_title(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "parley=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed CLI arguments supplying overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
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
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("PARLEY_SERVER_URL") {
            self.server.base_url = url;
        }

        if let Ok(timeout) = std::env::var("PARLEY_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.server.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid PARLEY_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(interval) = std::env::var("PARLEY_POLL_INTERVAL_SECONDS") {
            if let Ok(value) = interval.parse() {
                self.sync.poll_interval_seconds = value;
            } else {
                tracing::warn!("Invalid PARLEY_POLL_INTERVAL_SECONDS: {}", interval);
            }
        }

        if let Ok(title) = std::env::var("PARLEY_SESSION_TITLE") {
            self.sync.new_session_title = title;
        }

        if let Ok(level) = std::env::var("PARLEY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("PARLEY_LOG_JSON") {
            match json.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.logging.json = true,
                "0" | "false" | "no" => self.logging.json = false,
                _ => tracing::warn!("Invalid PARLEY_LOG_JSON: {}", json),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(server) = &cli.server {
            self.server.base_url = server.clone();
        }
        if cli.verbose {
            self.logging.level = "parley=debug".to_string();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Config`] describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.server.base_url).map_err(|e| {
            ParleyError::Config(format!(
                "server.base_url is not a valid URL ({}): {}",
                self.server.base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ParleyError::Config(format!(
                "server.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.server.timeout_seconds == 0 {
            return Err(
                ParleyError::Config("server.timeout_seconds must be positive".to_string()).into(),
            );
        }

        if self.sync.poll_interval_seconds == 0 {
            return Err(ParleyError::Config(
                "sync.poll_interval_seconds must be positive".to_string(),
            )
            .into());
        }

        if self.sync.poll_interval_seconds > 3600 {
            return Err(ParleyError::Config(
                "sync.poll_interval_seconds must be at most 3600".to_string(),
            )
            .into());
        }

        if self.sync.new_session_title.trim().is_empty() {
            return Err(
                ParleyError::Config("sync.new_session_title cannot be empty".to_string()).into(),
            );
        }

        if self.sync.fallback_title.trim().is_empty() {
            return Err(
                ParleyError::Config("sync.fallback_title cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
