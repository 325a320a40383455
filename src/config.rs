//! Dayflow Client Configuration
//!
//! Manages the base URL and tuning knobs for the request executor.
//! Config is stored in `~/.config/dayflow/client.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`DAYFLOW_API_URL`)
//! 2. Config file (`~/.config/dayflow/client.toml`)
//! 3. Defaults

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::resilience::CircuitBreakerConfig;
use crate::timeout::Timeouts;

fn default_base_url() -> String {
    "https://api.dayflow.app".to_string()
}

fn default_user_agent() -> String {
    format!("dayflow-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL; request paths are appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header for all outgoing requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// TCP connect timeout, separate from the per-request budgets
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Circuit breaker tuning
    #[serde(default)]
    pub breaker: BreakerSettings,

    /// Timeout tier overrides
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
            breaker: BreakerSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_reset_period_secs() -> u64 {
    30
}

/// Circuit breaker settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakerSettings {
    /// Consecutive failures before the circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Cool-down before a trial call is admitted
    #[serde(default = "default_reset_period_secs")]
    pub reset_period_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_period_secs: default_reset_period_secs(),
        }
    }
}

/// Timeout tier overrides; unset tiers keep their built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeoutSettings {
    pub quick_ms: Option<u64>,
    pub default_ms: Option<u64>,
    pub long_ms: Option<u64>,
}

impl ClientConfig {
    /// Get the config directory path
    ///
    /// Returns `~/.config/dayflow/` on Unix, `%APPDATA%/dayflow/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayflow")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("client.toml")
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| ApiError::Unexpected {
            message: format!("Failed to read config file: {}", e),
        })?;

        toml::from_str(&content).map_err(|e| ApiError::Unexpected {
            message: format!("Failed to parse config file: {}", e),
        })
    }

    /// Save configuration to file
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir();
        let path = Self::config_path();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| ApiError::Unexpected {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ApiError::Unexpected {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ApiError::Unexpected {
            message: format!("Failed to write config file: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("DAYFLOW_API_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// TCP connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Breaker configuration derived from the settings
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
            .with_failure_threshold(self.breaker.failure_threshold)
            .with_reset_period(Duration::from_secs(self.breaker.reset_period_secs))
    }

    /// Initial timeout tiers, with any overrides applied
    pub fn initial_timeouts(&self) -> Timeouts {
        let mut budgets = Timeouts::default();
        if let Some(ms) = self.timeouts.quick_ms {
            budgets.quick = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timeouts.default_ms {
            budgets.default = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timeouts.long_ms {
            budgets.long = Duration::from_millis(ms);
        }
        budgets
    }
}
