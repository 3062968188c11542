//! # Error Types
//!
//! Error kinds carried on the wire and the envelope decoding errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-readable failure category.
///
/// Serialized as the `code` field of an error body. `Timeout`, `NotConnected`
/// and `Stale` are produced by the client only and never sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed request parameters.
    ValidationError,
    /// Unknown account or receipt.
    NotFound,
    /// Receipt was already paid.
    AlreadyPaid,
    /// Balance lower than the receipt amount.
    InsufficientFunds,
    /// Account exists but is not active.
    AccountInactive,
    /// Unexpected domain failure.
    #[default]
    OperationError,
    /// No reply within the call window.
    Timeout,
    /// Call attempted while the transport is not open.
    NotConnected,
    /// Pending call discarded after a reconnect.
    Stale,
    /// Action outside the supported set.
    UnknownAction,
    /// Frame could not be decoded as an envelope.
    MalformedMessage,
}

impl ErrorKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::NotFound => "not_found",
            Self::AlreadyPaid => "already_paid",
            Self::InsufficientFunds => "insufficient_funds",
            Self::AccountInactive => "account_inactive",
            Self::OperationError => "operation_error",
            Self::Timeout => "timeout",
            Self::NotConnected => "not_connected",
            Self::Stale => "stale",
            Self::UnknownAction => "unknown_action",
            Self::MalformedMessage => "malformed_message",
        }
    }

    /// True for kinds that only the client can produce.
    pub fn is_client_side(&self) -> bool {
        matches!(self, Self::Timeout | Self::NotConnected | Self::Stale)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while decoding or encoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Frame is not valid JSON.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Frame is JSON but not an object.
    #[error("message must be a JSON object")]
    NotAnObject,

    /// The `action` field is absent or not a string.
    #[error("the \"action\" field is required")]
    MissingAction,

    /// The action is not part of the supported set.
    #[error("action \"{0}\" is not supported")]
    UnknownAction(String),

    /// `requestId` present but not a non-negative integer.
    #[error("requestId must be a non-negative integer")]
    InvalidRequestId,

    /// Encoding failed.
    #[error("encode error: {0}")]
    Encode(String),
}

impl EnvelopeError {
    /// Wire error kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAction(_) => ErrorKind::UnknownAction,
            Self::MissingAction | Self::InvalidRequestId => ErrorKind::ValidationError,
            Self::Malformed(_) | Self::NotAnObject | Self::Encode(_) => {
                ErrorKind::MalformedMessage
            }
        }
    }

    /// Short human-readable title used in error bodies.
    pub fn title(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => "Invalid action",
            Self::MissingAction => "Action required",
            Self::InvalidRequestId => "Invalid request id",
            Self::Malformed(_) | Self::NotAnObject | Self::Encode(_) => {
                "Error processing message"
            }
        }
    }
}
