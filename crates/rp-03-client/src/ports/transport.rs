//! Transport port.
//!
//! An open connection is a pair of text-frame channels. The connection is
//! closed from the client side by dropping `outgoing`, and from the remote
//! side when `incoming` yields `None`.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// One open connection.
pub struct Transport {
    pub outgoing: mpsc::UnboundedSender<String>,
    pub incoming: mpsc::UnboundedReceiver<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Opens transports to the gateway.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Transport, TransportError>;
}
