//! Gateway error types.
//!
//! [`RouteError`] is the structured failure sent back to a caller; every
//! domain or validation failure is converted into one at the router
//! boundary and never closes the connection.

use rp_01_ledger::LedgerError;
use shared_types::{Action, ErrorKind, Response};

/// Failure of a routed request, ready to be sent as an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{title}: {message}")]
pub struct RouteError {
    pub kind: ErrorKind,
    pub title: String,
    pub message: String,
}

impl RouteError {
    pub fn new(kind: ErrorKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Missing or malformed request parameter.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, "Invalid parameters", message)
    }

    /// Inbound frame over the size limit.
    pub fn message_too_large(size: usize, max: usize) -> Self {
        Self::new(
            ErrorKind::ValidationError,
            "Message too large",
            format!("message is {size} bytes (max: {max})"),
        )
    }

    /// Frame that could not be read as a request at all.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedMessage, "Error processing message", message)
    }

    /// Domain failure while handling `action`.
    pub fn from_ledger(action: Action, err: &LedgerError) -> Self {
        Self::new(err.kind(), failure_title(action), err.to_string())
    }

    /// Error envelope echoing `request_id`.
    pub fn to_response(&self, request_id: Option<u64>) -> Response {
        Response::failure(request_id, self.kind, self.title.clone(), self.message.clone())
    }
}

/// Title used for domain failures of each action.
pub fn failure_title(action: Action) -> &'static str {
    match action {
        Action::ConsultarRecibo => "Error querying receipts",
        Action::ProcesarPago => "Error processing payment",
        Action::ObtenerRecibo => "Error fetching receipt",
        Action::ObtenerSaldo => "Error fetching balance",
        Action::Ping => "Error answering ping",
    }
}

/// Gateway service error
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(#[source] std::io::Error),

    /// Service already running
    #[error("gateway already started")]
    AlreadyStarted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AccountId, ReceiptId};

    #[test]
    fn test_ledger_errors_keep_their_kind() {
        let err = LedgerError::AlreadyPaid(ReceiptId::new(789).unwrap());
        let route = RouteError::from_ledger(Action::ProcesarPago, &err);
        assert_eq!(route.kind, ErrorKind::AlreadyPaid);
        assert_eq!(route.title, "Error processing payment");
        assert!(route.message.contains("789"));

        let err = LedgerError::AccountNotFound(AccountId::parse("ZZZ").unwrap());
        let route = RouteError::from_ledger(Action::ObtenerSaldo, &err);
        assert_eq!(route.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_error_response_echoes_request_id() {
        let response = RouteError::invalid_params("numeroCuenta is required").to_response(Some(4));
        assert_eq!(response.request_id, Some(4));
        assert_eq!(response.message_type, "error");
        let body = response.error.unwrap();
        assert_eq!(body.code, ErrorKind::ValidationError);
        assert_eq!(body.message, "numeroCuenta is required");
    }

    #[test]
    fn test_malformed_frame_error() {
        let response = RouteError::malformed("binary frame is not valid UTF-8").to_response(None);
        assert_eq!(response.request_id, None);
        let body = response.error.unwrap();
        assert_eq!(body.code, ErrorKind::MalformedMessage);
        assert_eq!(body.title, "Error processing message");
    }
}
