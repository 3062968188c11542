//! Request Router
//!
//! Validates action parameters, invokes the ledger and shapes the reply
//! data plus any event to fan out. Stateless apart from the ledger handle;
//! never retries.

use crate::domain::{ConnectionId, RouteError};
use rp_01_ledger::LedgerApi;
use serde::Serialize;
use serde_json::{json, Value};
use shared_types::{AccountId, Action, EventType, Params, ReceiptId, Response};
use std::sync::Arc;
use tracing::debug;

/// Event to fan out after a successful request.
#[derive(Debug, Clone, PartialEq)]
pub enum Broadcast {
    /// Every connection, including the caller.
    All(Response),
    /// Every connection except the caller.
    Others(Response),
}

/// Result of a successfully routed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    /// `data` of the direct reply.
    pub data: Value,
    pub broadcast: Option<Broadcast>,
}

impl RouteOutcome {
    fn reply(data: Value) -> Self {
        Self {
            data,
            broadcast: None,
        }
    }
}

pub struct RequestRouter {
    ledger: Arc<dyn LedgerApi>,
}

impl RequestRouter {
    pub fn new(ledger: Arc<dyn LedgerApi>) -> Self {
        Self { ledger }
    }

    /// Handle one request from `client`.
    pub async fn route(
        &self,
        client: &ConnectionId,
        action: Action,
        params: &Params,
    ) -> Result<RouteOutcome, RouteError> {
        debug!(connection_id = %client, action = %action, "routing request");

        match action {
            Action::ConsultarRecibo => {
                let account = account_param(params)?;
                let pending = self
                    .ledger
                    .pending_receipts(&account)
                    .await
                    .map_err(|e| RouteError::from_ledger(action, &e))?;
                let event = Response::event(
                    EventType::ReciboConsultado,
                    json!({
                        "numeroCuenta": account,
                        "totalRecibos": pending.total_recibos,
                    }),
                );
                Ok(RouteOutcome {
                    data: to_data(action, &pending)?,
                    broadcast: Some(Broadcast::Others(event)),
                })
            }
            Action::ProcesarPago => {
                let receipt = receipt_param(params)?;
                let account = account_param(params)?;
                let method = optional_string_param(params, "metodoPago")?;
                let payment = self
                    .ledger
                    .process_payment(receipt, &account, method)
                    .await
                    .map_err(|e| RouteError::from_ledger(action, &e))?;
                let event = Response::event(
                    EventType::PagoProcesado,
                    json!({
                        "idRecibo": payment.id_recibo,
                        "numeroCuenta": payment.numero_cuenta,
                        "monto": payment.monto_pagado,
                    }),
                );
                Ok(RouteOutcome {
                    data: to_data(action, &payment)?,
                    broadcast: Some(Broadcast::All(event)),
                })
            }
            Action::ObtenerRecibo => {
                let receipt = receipt_param(params)?;
                let account = account_param(params)?;
                let paid = self
                    .ledger
                    .paid_receipt(receipt, &account)
                    .await
                    .map_err(|e| RouteError::from_ledger(action, &e))?;
                Ok(RouteOutcome::reply(to_data(action, &paid)?))
            }
            Action::ObtenerSaldo => {
                let account = account_param(params)?;
                let balance = self
                    .ledger
                    .balance(&account)
                    .await
                    .map_err(|e| RouteError::from_ledger(action, &e))?;
                Ok(RouteOutcome::reply(to_data(action, &balance)?))
            }
            Action::Ping => Ok(RouteOutcome::reply(json!({ "clientId": client }))),
        }
    }
}

fn to_data<T: Serialize>(action: Action, value: &T) -> Result<Value, RouteError> {
    serde_json::to_value(value).map_err(|e| {
        RouteError::new(
            shared_types::ErrorKind::OperationError,
            crate::domain::failure_title(action),
            e.to_string(),
        )
    })
}

/// `numeroCuenta`: non-empty string.
fn account_param(params: &Params) -> Result<AccountId, RouteError> {
    match params.get("numeroCuenta") {
        Some(Value::String(raw)) => AccountId::parse(raw)
            .ok_or_else(|| RouteError::invalid_params("numeroCuenta must not be empty")),
        Some(Value::Null) | None => Err(RouteError::invalid_params("numeroCuenta is required")),
        Some(_) => Err(RouteError::invalid_params("numeroCuenta must be a string")),
    }
}

/// `idRecibo`: positive integer, as a JSON number or a numeric string.
fn receipt_param(params: &Params) -> Result<ReceiptId, RouteError> {
    let invalid = || RouteError::invalid_params("idRecibo must be a positive integer");
    let raw = match params.get("idRecibo") {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(invalid)?,
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid())?,
        Some(Value::Null) | None => {
            return Err(RouteError::invalid_params("idRecibo is required"));
        }
        Some(_) => return Err(invalid()),
    };
    ReceiptId::new(raw).ok_or_else(invalid)
}

fn optional_string_param(params: &Params, name: &str) -> Result<Option<String>, RouteError> {
    match params.get(name) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(RouteError::invalid_params(format!(
            "{name} must be a string"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rp_01_ledger::{Account, InMemoryLedgerStore, LedgerService, Receipt};
    use rust_decimal_macros::dec;
    use shared_types::{ErrorKind, Money};

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test params must be an object"),
        }
    }

    fn router() -> (RequestRouter, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let abc = AccountId::parse("ABC").unwrap();
        store.insert_account(Account::new(
            abc.clone(),
            "Ana",
            Money::new(dec!(500.00)),
            Utc::now(),
        ));
        store
            .insert_receipt(Receipt::pending(
                ReceiptId::new(789).unwrap(),
                abc,
                Money::new(dec!(120.00)),
                Utc::now(),
                Utc::now() + chrono::Duration::days(10),
            ))
            .unwrap();
        let ledger = Arc::new(LedgerService::new(store.clone()));
        (RequestRouter::new(ledger), store)
    }

    fn client() -> ConnectionId {
        ConnectionId::from("client_1_abc")
    }

    #[test]
    fn test_receipt_param_accepts_numeric_strings() {
        let ok = receipt_param(&params(json!({"idRecibo": "789"}))).unwrap();
        assert_eq!(ok.value(), 789);
        let ok = receipt_param(&params(json!({"idRecibo": 789}))).unwrap();
        assert_eq!(ok.value(), 789);

        for bad in [json!({"idRecibo": 0}), json!({"idRecibo": "7x"}), json!({"idRecibo": 1.5}), json!({})] {
            let err = receipt_param(&params(bad)).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ValidationError);
        }
    }

    #[test]
    fn test_account_param_rules() {
        assert!(account_param(&params(json!({"numeroCuenta": "ABC"}))).is_ok());
        for bad in [json!({"numeroCuenta": ""}), json!({"numeroCuenta": 12}), json!({})] {
            assert_eq!(
                account_param(&params(bad)).unwrap_err().kind,
                ErrorKind::ValidationError
            );
        }
    }

    #[tokio::test]
    async fn test_payment_broadcasts_to_all() {
        let (router, _store) = router();
        let outcome = router
            .route(
                &client(),
                Action::ProcesarPago,
                &params(json!({"idRecibo": 789, "numeroCuenta": "ABC"})),
            )
            .await
            .unwrap();

        assert_eq!(outcome.data["nuevoSaldo"], 380.0);
        assert_eq!(outcome.data["metodoPago"], "Saldo en cuenta");
        match outcome.broadcast {
            Some(Broadcast::All(event)) => {
                assert_eq!(event.message_type, "pago_procesado");
                assert!(event.is_event());
                let data = event.data.unwrap();
                assert_eq!(data["idRecibo"], 789);
                assert_eq!(data["monto"], 120.0);
            }
            other => panic!("expected broadcast to all, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_consultation_notifies_others() {
        let (router, _store) = router();
        let outcome = router
            .route(
                &client(),
                Action::ConsultarRecibo,
                &params(json!({"numeroCuenta": "ABC"})),
            )
            .await
            .unwrap();
        assert_eq!(outcome.data["totalRecibos"], 1);
        assert!(matches!(outcome.broadcast, Some(Broadcast::Others(_))));
    }

    #[tokio::test]
    async fn test_validation_happens_before_domain_call() {
        let (router, store) = router();
        let err = router
            .route(
                &client(),
                Action::ProcesarPago,
                &params(json!({"idRecibo": "abc", "numeroCuenta": "ABC"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_domain_errors_are_mapped() {
        let (router, _store) = router();
        let err = router
            .route(
                &client(),
                Action::ObtenerRecibo,
                &params(json!({"idRecibo": 789, "numeroCuenta": "ABC"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.title, "Error fetching receipt");

        let err = router
            .route(
                &client(),
                Action::ObtenerSaldo,
                &params(json!({"numeroCuenta": "NOPE"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_ping_returns_client_id() {
        let (router, _store) = router();
        let outcome = router
            .route(&client(), Action::Ping, &Params::new())
            .await
            .unwrap();
        assert_eq!(outcome.data["clientId"], "client_1_abc");
        assert!(outcome.broadcast.is_none());
    }
}
