//! # Node Configuration
//!
//! Loaded from an optional TOML file named by `RP_CONFIG`, then overridden
//! from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `RP_HOST` | `gateway.websocket.host` |
//! | `RP_PORT` | `gateway.websocket.port` |
//! | `RP_HEARTBEAT_SECS` | `gateway.heartbeat.interval` (seconds or `"45s"`) |
//! | `RP_MAX_MESSAGE_SIZE` | `gateway.limits.max_message_size` |

use rp_02_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "RP_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub gateway: GatewayConfig,
    pub seed: SeedConfig,
}

/// Startup data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Load the demo accounts and receipts.
    pub demo_data: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self { demo_data: true }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl NodeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Load configuration from file and environment.
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    let mut config = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            NodeConfig::from_file(&path)?
        }
        Err(_) => NodeConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Apply `RP_*` overrides. Unparseable values are logged and ignored.
pub fn apply_env_overrides(config: &mut NodeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("RP_HOST") {
        match host.parse::<IpAddr>() {
            Ok(ip) => config.gateway.websocket.host = ip,
            Err(_) => warn!(value = %host, "RP_HOST is not an IP address"),
        }
    }

    if let Some(port) = lookup("RP_PORT") {
        match port.parse() {
            Ok(p) => config.gateway.websocket.port = p,
            Err(_) => warn!(value = %port, "RP_PORT is not a port number"),
        }
    }

    if let Some(interval) = lookup("RP_HEARTBEAT_SECS") {
        match shared_types::humantime_serde::parse_duration(&interval) {
            Ok(d) => config.gateway.heartbeat.interval = d,
            Err(e) => warn!(error = %e, "RP_HEARTBEAT_SECS ignored"),
        }
    }

    if let Some(size) = lookup("RP_MAX_MESSAGE_SIZE") {
        match size.parse() {
            Ok(s) => config.gateway.limits.max_message_size = s,
            Err(_) => warn!(value = %size, "RP_MAX_MESSAGE_SIZE is not a byte count"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_toml_file_layout() {
        let config = NodeConfig::from_toml_str(
            r#"
            [gateway.websocket]
            host = "127.0.0.1"
            port = 9001

            [gateway.heartbeat]
            interval = "10s"

            [seed]
            demo_data = false
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.ws_addr().to_string(), "127.0.0.1:9001");
        assert_eq!(config.gateway.heartbeat.interval, Duration::from_secs(10));
        assert_eq!(config.gateway.limits.max_message_size, 64 * 1024);
        assert!(!config.seed.demo_data);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(config.gateway.websocket.port, 8080);
        assert!(config.seed.demo_data);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("RP_HOST", "127.0.0.1"),
            ("RP_PORT", "9100"),
            ("RP_HEARTBEAT_SECS", "45"),
            ("RP_MAX_MESSAGE_SIZE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = NodeConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.gateway.ws_addr().to_string(), "127.0.0.1:9100");
        assert_eq!(config.gateway.heartbeat.interval, Duration::from_secs(45));
        // Bad values keep the previous setting.
        assert_eq!(config.gateway.limits.max_message_size, 64 * 1024);
    }

    #[test]
    fn test_bad_toml_is_reported() {
        assert!(matches!(
            NodeConfig::from_toml_str("gateway = 5"),
            Err(ConfigError::Parse(_))
        ));
    }
}
