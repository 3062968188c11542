//! # Request/Reply Flows
//!
//! Correlated calls from `CorrelationClient` through the gateway into the
//! seeded ledger and back.
//!
//! | Account | Balance | Pending |
//! |---------|---------|---------|
//! | `ABC` | 500.00 | 789 (120.00), 101, 102 |
//! | `XYZ` | 50.00 | 200 (100.00) |

use super::harness::{account, receipt, TestNode, WAIT};
use rp_03_client::{ClientError, ClientEvent, ConnectionState, DEFAULT_PAYMENT_METHOD};
use rust_decimal_macros::dec;
use shared_types::{ErrorKind, Money, ReceiptStatus};
use std::sync::atomic::Ordering;

fn server_kind(result: Result<impl std::fmt::Debug, ClientError>) -> ErrorKind {
    match result {
        Err(ClientError::Server { kind, .. }) => kind,
        other => panic!("expected a server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pay_receipt_then_fetch_it() {
    let node = TestNode::start().await;
    let abc = account("ABC");
    let client = node.client().await.client;

    let pending = client.consultar_recibo(&abc).await.unwrap();
    assert_eq!(pending.total_recibos, 3);
    assert_eq!(pending.saldo_disponible, Money::new(dec!(500.00)));
    assert!(pending.recibos.iter().any(|r| r.id_recibo == receipt(789)));

    let payment = client.procesar_pago(receipt(789), &abc, None).await.unwrap();
    assert_eq!(payment.monto_pagado, Money::new(dec!(120.00)));
    assert_eq!(payment.nuevo_saldo, Money::new(dec!(380.00)));
    assert_eq!(payment.metodo_pago, DEFAULT_PAYMENT_METHOD);

    let paid = client.obtener_recibo(receipt(789), &abc).await.unwrap();
    assert_eq!(paid.estado, ReceiptStatus::Paid);
    assert_eq!(paid.numero_transaccion, payment.numero_transaccion);
    assert_eq!(paid.saldo_actual, Money::new(dec!(380.00)));

    let balance = client.obtener_saldo(&abc).await.unwrap();
    assert_eq!(balance.saldo, Money::new(dec!(380.00)));

    let pending = client.consultar_recibo(&abc).await.unwrap();
    assert_eq!(pending.total_recibos, 2);

    node.shutdown().await;
}

#[tokio::test]
async fn test_second_payment_of_same_receipt_is_rejected() {
    let node = TestNode::start().await;
    let abc = account("ABC");
    let client = node.client().await.client;

    client.procesar_pago(receipt(789), &abc, Some("Tarjeta")).await.unwrap();
    let again = client.procesar_pago(receipt(789), &abc, None).await;
    assert_eq!(server_kind(again), ErrorKind::AlreadyPaid);

    // The failed attempt did not touch the balance.
    let balance = client.obtener_saldo(&abc).await.unwrap();
    assert_eq!(balance.saldo, Money::new(dec!(380.00)));

    node.shutdown().await;
}

#[tokio::test]
async fn test_insufficient_funds_leaves_receipt_pending() {
    let node = TestNode::start().await;
    let xyz = account("XYZ");
    let client = node.client().await.client;

    let result = client.procesar_pago(receipt(200), &xyz, None).await;
    assert_eq!(server_kind(result), ErrorKind::InsufficientFunds);

    let pending = client.consultar_recibo(&xyz).await.unwrap();
    assert_eq!(pending.total_recibos, 1);
    assert!(!pending.puede_pagar_todos);
    assert_eq!(node.runtime.store().record_count(), 0);

    node.shutdown().await;
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let node = TestNode::start().await;
    let client = node.client().await.client;

    let result = client.consultar_recibo(&account("NOPE")).await;
    assert_eq!(server_kind(result), ErrorKind::NotFound);

    let result = client.procesar_pago(receipt(999), &account("ABC"), None).await;
    assert_eq!(server_kind(result), ErrorKind::NotFound);

    // Receipt exists but belongs to another account.
    let result = client.procesar_pago(receipt(200), &account("ABC"), None).await;
    assert_eq!(server_kind(result), ErrorKind::NotFound);

    node.shutdown().await;
}

#[tokio::test]
async fn test_ping_reply_carries_client_id() {
    let node = TestNode::start().await;
    let client = node.client().await.client;

    let reply = client.ping().await.unwrap();
    assert_eq!(reply.message_type, "pong");
    assert!(reply.data["clientId"].as_str().is_some_and(|id| !id.is_empty()));

    node.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_calls_resolve_independently() {
    let node = TestNode::start().await;
    let client = node.client().await.client;
    let (abc, xyz) = (account("ABC"), account("XYZ"));

    let (a, b, c) = tokio::join!(
        client.obtener_saldo(&abc),
        client.obtener_saldo(&xyz),
        client.consultar_recibo(&abc),
    );
    assert_eq!(a.unwrap().saldo, Money::new(dec!(500.00)));
    assert_eq!(b.unwrap().saldo, Money::new(dec!(50.00)));
    assert_eq!(c.unwrap().total_recibos, 3);

    let stats = client.pending_stats();
    assert_eq!(client.connection_state().pending_calls, 0);
    assert_eq!(stats.total_completed.load(Ordering::Relaxed), 3);
    assert_eq!(stats.total_unmatched.load(Ordering::Relaxed), 0);

    node.shutdown().await;
}

#[tokio::test]
async fn test_server_shutdown_is_seen_as_unexpected_close() {
    let node = TestNode::start().await;
    let mut handle = node.client().await;

    node.shutdown().await;

    let closed = tokio::time::timeout(WAIT, async {
        loop {
            if let Ok(ClientEvent::Disconnected { intentional }) = handle.events.recv().await {
                return intentional;
            }
        }
    })
    .await
    .unwrap();
    assert!(!closed);
    assert_ne!(
        handle.client.connection_state().state,
        ConnectionState::Connected
    );
    handle.client.disconnect();
}
