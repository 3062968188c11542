//! Domain types for the gateway.

pub mod config;
pub mod connection;
pub mod error;

pub use config::{ConfigError, GatewayConfig, HeartbeatConfig, LimitsConfig, WebSocketConfig};
pub use connection::{ConnectionId, ConnectionInfo};
pub use error::{failure_title, GatewayError, RouteError};
