//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// WebSocket server configuration
    pub websocket: WebSocketConfig,
    /// Liveness sweep configuration
    pub heartbeat: HeartbeatConfig,
    /// Message limits
    pub limits: LimitsConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat.interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "heartbeat interval cannot be 0".into(),
            ));
        }

        if self.limits.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// WebSocket server bind address
    pub fn ws_addr(&self) -> SocketAddr {
        SocketAddr::new(self.websocket.host, self.websocket.port)
    }
}

/// WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080, 0 picks a free port)
    pub port: u16,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
        }
    }
}

/// Heartbeat sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Time between two sweeps. A connection silent for two sweeps is dropped.
    #[serde(with = "shared_types::humantime_serde")]
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Message limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max inbound frame size in bytes (default: 64KB)
    pub max_message_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ws_addr().port(), 8080);
        assert_eq!(config.heartbeat.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_heartbeat_rejected() {
        let mut config = GatewayConfig::default();
        config.heartbeat.interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{"websocket":{"port":8080},"heartbeat":{"interval":"10s"}}"#,
        )
        .unwrap();
        assert_eq!(config.websocket.port, 8080);
        assert_eq!(config.heartbeat.interval, Duration::from_secs(10));
        assert_eq!(config.limits.max_message_size, 64 * 1024);
    }
}
