//! # Correlation Client
//!
//! Client side of the payment gateway protocol. Calls look synchronous to
//! the caller: `call()` sends a request tagged with a fresh `requestId` and
//! resolves when the matching reply arrives, the call times out, or the
//! call is discarded as stale after a reconnect.
//!
//! ## Reconnection
//!
//! An unexpected close moves the client to `Connecting` and retries after
//! `min(base * 2^failures, cap)`, where `failures` counts consecutive failed
//! attempts since the last successful open. After `max_retries` failures the
//! client gives up. `disconnect()` never reconnects.
//!
//! ## Module Structure
//!
//! - `domain/` - config, errors, state machine, pending calls, replies
//! - `ports/` - `Connector` transport port
//! - `adapters/` - tungstenite and in-process connectors
//! - `client` - `CorrelationClient`
//!
//! ```ignore
//! use rp_03_client::{ClientConfig, CorrelationClient, WsConnector};
//!
//! let client = CorrelationClient::new(ClientConfig::with_url("ws://127.0.0.1:8080"), WsConnector)?;
//! client.connect().await?;
//! let balance = client.obtener_saldo(&account).await?;
//! ```

pub mod adapters;
pub mod client;
pub mod domain;
pub mod ports;

pub use adapters::{ChannelConnector, ServerEnd, WsConnector};
pub use client::{CorrelationClient, DEFAULT_PAYMENT_METHOD};
pub use domain::{
    backoff_delay, ClientConfig, ClientError, ClientEvent, ConfigError, ConnectionSnapshot,
    ConnectionState, PendingStats, ReconnectConfig, Reply,
};
pub use ports::{Connector, Transport, TransportError};
