//! Client domain: configuration, state machine, pending calls, replies.

pub mod config;
pub mod error;
pub mod pending;
pub mod reply;
pub mod state;

pub use config::{ClientConfig, ConfigError, ReconnectConfig};
pub use error::ClientError;
pub use pending::{CallResult, PendingCalls, PendingStats, ResendPlan};
pub use reply::{ClientEvent, Reply};
pub use state::{backoff_delay, ConnectionSnapshot, ConnectionState};
