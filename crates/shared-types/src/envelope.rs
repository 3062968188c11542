//! # Wire Envelope
//!
//! One JSON object per text frame, in two families:
//!
//! - **Request**: `{ "action": string, "requestId"?: int, ...params }`
//! - **Response/Event**: `{ "type": string, "requestId"?: int, "success"?: bool,
//!   "data"?: object, "error"?: {title, message, code}, "timestamp": ISO-8601 }`
//!
//! A response carrying `requestId` is a direct reply and belongs to exactly
//! one caller. A response without it is an event.

use crate::entities::{AccountId, ReceiptId};
use crate::errors::{EnvelopeError, ErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Protocol version covering the current [`Action`] set.
pub const PROTOCOL_VERSION: u16 = 1;

/// Action-specific request fields.
pub type Params = serde_json::Map<String, Value>;

/// The closed set of supported request actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// List pending receipts of an account.
    ConsultarRecibo,
    /// Pay one receipt from the account balance.
    ProcesarPago,
    /// Fetch a paid receipt.
    ObtenerRecibo,
    /// Fetch the account balance summary.
    ObtenerSaldo,
    /// Application-level liveness check.
    Ping,
}

impl Action {
    /// Every supported action, in protocol order.
    pub const ALL: [Action; 5] = [
        Action::ConsultarRecibo,
        Action::ProcesarPago,
        Action::ObtenerRecibo,
        Action::ObtenerSaldo,
        Action::Ping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsultarRecibo => "consultar_recibo",
            Self::ProcesarPago => "procesar_pago",
            Self::ObtenerRecibo => "obtener_recibo",
            Self::ObtenerSaldo => "obtener_saldo",
            Self::Ping => "ping",
        }
    }

    /// `type` of a successful direct reply to this action.
    pub fn response_type(&self) -> &'static str {
        match self {
            Self::ConsultarRecibo => "consultar_recibo_response",
            Self::ProcesarPago => "procesar_pago_response",
            Self::ObtenerRecibo => "obtener_recibo_response",
            Self::ObtenerSaldo => "obtener_saldo_response",
            Self::Ping => EventType::Pong.as_str(),
        }
    }

    /// True for actions that change money state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::ProcesarPago)
    }
}

impl FromStr for Action {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| EnvelopeError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-originated event types. Events never carry a `requestId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    ConnectionEstablished,
    Pong,
    PagoProcesado,
    ReciboConsultado,
    Error,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished => "connection_established",
            Self::Pong => "pong",
            Self::PagoProcesado => "pago_procesado",
            Self::ReciboConsultado => "recibo_consultado",
            Self::Error => "error",
        }
    }
}

// =============================================================================
// INBOUND (server side)
// =============================================================================

/// A request decoded far enough to be routed: action known, params untyped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub action: Action,
    pub request_id: Option<u64>,
    pub params: Params,
}

/// Decoding failure, with the request id if one could be recovered so the
/// error reply can still be correlated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct ParseFailure {
    pub request_id: Option<u64>,
    pub error: EnvelopeError,
}

impl RawRequest {
    /// Decode a text frame. Total: any input yields `Ok` or `Err`.
    pub fn parse(text: &str) -> Result<Self, ParseFailure> {
        let value: Value = serde_json::from_str(text).map_err(|e| ParseFailure {
            request_id: None,
            error: EnvelopeError::Malformed(e.to_string()),
        })?;

        let Value::Object(mut fields) = value else {
            return Err(ParseFailure {
                request_id: None,
                error: EnvelopeError::NotAnObject,
            });
        };

        let request_id = match fields.remove("requestId") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_u64() {
                Some(id) => Some(id),
                None => {
                    return Err(ParseFailure {
                        request_id: None,
                        error: EnvelopeError::InvalidRequestId,
                    })
                }
            },
        };

        let fail = |error| ParseFailure { request_id, error };

        let action = match fields.remove("action") {
            Some(Value::String(name)) => name.parse::<Action>().map_err(fail)?,
            _ => return Err(fail(EnvelopeError::MissingAction)),
        };

        Ok(Self {
            action,
            request_id,
            params: fields,
        })
    }
}

// =============================================================================
// OUTBOUND REQUESTS (client side)
// =============================================================================

/// Typed request, one variant per [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Request {
    ConsultarRecibo {
        numero_cuenta: AccountId,
    },
    ProcesarPago {
        id_recibo: ReceiptId,
        numero_cuenta: AccountId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metodo_pago: Option<String>,
    },
    ObtenerRecibo {
        id_recibo: ReceiptId,
        numero_cuenta: AccountId,
    },
    ObtenerSaldo {
        numero_cuenta: AccountId,
    },
    Ping,
}

impl Request {
    pub fn action(&self) -> Action {
        match self {
            Self::ConsultarRecibo { .. } => Action::ConsultarRecibo,
            Self::ProcesarPago { .. } => Action::ProcesarPago,
            Self::ObtenerRecibo { .. } => Action::ObtenerRecibo,
            Self::ObtenerSaldo { .. } => Action::ObtenerSaldo,
            Self::Ping => Action::Ping,
        }
    }
}

/// A request plus its correlation id, flattened into one JSON object.
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    #[serde(flatten)]
    pub request: &'a Request,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl<'a> RequestEnvelope<'a> {
    pub fn new(request: &'a Request, request_id: Option<u64>) -> Self {
        Self {
            request,
            request_id,
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|e| EnvelopeError::Encode(e.to_string()))
    }
}

// =============================================================================
// RESPONSES AND EVENTS
// =============================================================================

/// Error payload of a failed reply or an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub code: ErrorKind,
}

/// Response or event frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: DateTime<Utc>,
}

impl Response {
    /// Successful direct reply to `action`.
    pub fn success(action: Action, request_id: Option<u64>, data: Value) -> Self {
        Self {
            message_type: action.response_type().to_string(),
            request_id,
            success: Some(true),
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed reply. Without a `request_id` this is an `error` event.
    pub fn failure(
        request_id: Option<u64>,
        code: ErrorKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message_type: EventType::Error.as_str().to_string(),
            request_id,
            success: Some(false),
            data: None,
            error: Some(ErrorBody {
                title: title.into(),
                message: message.into(),
                code,
            }),
            timestamp: Utc::now(),
        }
    }

    /// Broadcast/narrowcast event with its fields in `data`.
    pub fn event(event: EventType, data: Value) -> Self {
        Self {
            message_type: event.as_str().to_string(),
            request_id: None,
            success: None,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Events carry no correlation id.
    pub fn is_event(&self) -> bool {
        self.request_id.is_none()
    }

    /// True when this frame reports a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.success == Some(false)
    }

    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|e| EnvelopeError::Encode(e.to_string()))
    }

    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(text).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }
}
