//! Replies and client-side events.

use super::error::ClientError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared_types::{ErrorKind, Response};
use std::time::Duration;

/// Successful direct reply to a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// `<action>_response`, or `pong`.
    pub message_type: String,
    pub request_id: u64,
    pub data: Value,
}

impl Reply {
    /// Decode `data` into a typed view.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        serde_json::from_value(self.data).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Turn a correlated response into the caller's outcome.
pub(crate) fn settle(request_id: u64, response: Response) -> Result<Reply, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::Server {
            kind: error.code,
            title: error.title,
            message: error.message,
        });
    }
    if response.success == Some(false) {
        return Err(ClientError::Server {
            kind: ErrorKind::OperationError,
            title: response.message_type,
            message: "request failed without details".into(),
        });
    }
    Ok(Reply {
        message_type: response.message_type,
        request_id,
        data: response.data.unwrap_or(Value::Null),
    })
}

/// Notifications published by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Transport opened.
    Connected,
    /// Transport closed. `intentional` is true after `disconnect()`.
    Disconnected { intentional: bool },
    /// Next attempt scheduled after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// Retries exhausted.
    GaveUp,
    /// Server event (frame without `requestId`).
    Server(Response),
}
