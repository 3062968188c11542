//! Client error types.

use super::config::ConfigError;
use shared_types::{Action, EnvelopeError, ErrorKind};
use thiserror::Error;

/// Failure of a client operation.
///
/// Every pending call is completed with either a reply or one of these;
/// none is raised unobserved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Call attempted while the transport is not open.
    #[error("not connected to the gateway")]
    NotConnected,

    /// No reply within the call window.
    #[error("request {request_id} ({action}) timed out")]
    Timeout { request_id: u64, action: Action },

    /// Pending call discarded on reconnect instead of being resent.
    #[error("request {request_id} ({action}) discarded as stale after reconnect")]
    Stale { request_id: u64, action: Action },

    /// The gateway answered with an error envelope.
    #[error("{title}: {message}")]
    Server {
        kind: ErrorKind,
        title: String,
        message: String,
    },

    /// Transport could not be opened.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Reply data did not have the expected shape.
    #[error("unexpected reply data: {0}")]
    Decode(String),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The client was dropped before the call completed.
    #[error("client closed")]
    Closed,
}

impl ClientError {
    /// Wire-level kind of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConnected | Self::ConnectFailed(_) => ErrorKind::NotConnected,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Stale { .. } => ErrorKind::Stale,
            Self::Server { kind, .. } => *kind,
            Self::Envelope(e) => e.kind(),
            Self::Decode(_) | Self::Config(_) | Self::Closed => ErrorKind::OperationError,
        }
    }
}
