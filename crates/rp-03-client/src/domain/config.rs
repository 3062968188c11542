//! Client configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Correlation client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Gateway WebSocket URL
    pub url: String,
    /// How long `call` waits for a reply
    #[serde(with = "shared_types::humantime_serde")]
    pub call_timeout: Duration,
    /// Pending calls older than this are failed instead of resent on reconnect
    #[serde(with = "shared_types::humantime_serde")]
    pub stale_after: Duration,
    /// Keep-alive ping interval while connected
    #[serde(with = "shared_types::humantime_serde")]
    pub heartbeat_interval: Duration,
    /// Reconnection policy
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080".to_string(),
            call_timeout: Duration::from_secs(30),
            stale_after: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl(self.url.clone()));
        }

        for (name, value) in [
            ("call_timeout", self.call_timeout),
            ("heartbeat_interval", self.heartbeat_interval),
            ("reconnect.base_delay", self.reconnect.base_delay),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidTimeout(format!("{name} cannot be 0")));
            }
        }

        if self.reconnect.max_delay < self.reconnect.base_delay {
            return Err(ConfigError::InvalidTimeout(
                "reconnect.max_delay must be >= reconnect.base_delay".into(),
            ));
        }

        if self.reconnect.max_retries == 0 {
            return Err(ConfigError::InvalidLimit(
                "reconnect.max_retries cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Exponential backoff policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first retry (default: 1s)
    #[serde(with = "shared_types::humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound for any retry delay (default: 30s)
    #[serde(with = "shared_types::humantime_serde")]
    pub max_delay: Duration,
    /// Consecutive failed attempts before giving up (default: 5)
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: 5,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
