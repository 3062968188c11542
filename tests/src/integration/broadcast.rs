//! # Fan-out and Raw Frames
//!
//! Events delivered to other connections, and frames the client library
//! never sends: unknown actions, garbage, oversized payloads.

use super::harness::{account, next_server_event, receipt, TestNode, WAIT};
use rust_decimal_macros::dec;
use serde_json::json;
use shared_types::{ErrorKind, Money};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_payment_is_broadcast_to_every_client() {
    let node = TestNode::start().await;
    let mut payer = node.client().await;
    let mut watcher = node.client().await;
    assert_eq!(node.runtime.gateway().registry().len(), 2);

    payer
        .client
        .procesar_pago(receipt(789), &account("ABC"), None)
        .await
        .unwrap();

    for handle in [&mut watcher, &mut payer] {
        let event = next_server_event(&mut handle.events, "pago_procesado").await;
        assert!(event.request_id.is_none());
        let data = event.data.unwrap();
        assert_eq!(data["idRecibo"], json!(789));
        assert_eq!(data["numeroCuenta"], json!("ABC"));
        let amount: Money = serde_json::from_value(data["monto"].clone()).unwrap();
        assert_eq!(amount, Money::new(dec!(120.00)));
    }

    node.shutdown().await;
}

#[tokio::test]
async fn test_consultation_is_announced_to_others_only() {
    let node = TestNode::start().await;
    let mut asker = node.client().await;
    let mut watcher = node.client().await;

    asker.client.consultar_recibo(&account("ABC")).await.unwrap();

    let event = next_server_event(&mut watcher.events, "recibo_consultado").await;
    let data = event.data.unwrap();
    assert_eq!(data["numeroCuenta"], json!("ABC"));
    assert_eq!(data["totalRecibos"], json!(3));

    // Anything queued for the asker before this reply has been delivered.
    asker.client.ping().await.unwrap();
    assert!(asker
        .drain_server_events()
        .iter()
        .all(|e| e.message_type != "recibo_consultado"));

    node.shutdown().await;
}

#[tokio::test]
async fn test_failed_payment_is_not_broadcast() {
    let node = TestNode::start().await;
    let payer = node.client().await;
    let mut watcher = node.client().await;

    let result = payer
        .client
        .procesar_pago(receipt(200), &account("XYZ"), None)
        .await;
    assert!(result.is_err());

    watcher.client.ping().await.unwrap();
    assert!(watcher
        .drain_server_events()
        .iter()
        .all(|e| e.message_type != "pago_procesado"));

    node.shutdown().await;
}

#[tokio::test]
async fn test_unknown_action_echoes_request_id() {
    let node = TestNode::start().await;
    let mut socket = node.raw().await;

    socket.send(r#"{"action":"borrar_cuenta","requestId":7}"#).await;
    let reply = socket.next_response().await;
    assert_eq!(reply.message_type, "error");
    assert_eq!(reply.request_id, Some(7));
    assert_eq!(reply.success, Some(false));
    assert_eq!(reply.error.unwrap().code, ErrorKind::UnknownAction);

    node.shutdown().await;
}

#[tokio::test]
async fn test_garbage_gets_uncorrelated_error_and_connection_survives() {
    let node = TestNode::start().await;
    let mut socket = node.raw().await;

    socket.send("this is not json").await;
    let reply = socket.next_response().await;
    assert_eq!(reply.message_type, "error");
    assert!(reply.request_id.is_none());
    assert_eq!(reply.error.unwrap().code, ErrorKind::MalformedMessage);

    socket.send(r#"{"numeroCuenta":"ABC","requestId":3}"#).await;
    let reply = socket.next_response().await;
    assert_eq!(reply.request_id, Some(3));
    assert_eq!(reply.error.unwrap().code, ErrorKind::ValidationError);

    socket.send(r#"{"action":"ping","requestId":4}"#).await;
    let reply = socket.next_response().await;
    assert_eq!(reply.message_type, "pong");
    assert_eq!(reply.request_id, Some(4));

    node.shutdown().await;
}

#[tokio::test]
async fn test_missing_parameters_are_validation_errors() {
    let node = TestNode::start().await;
    let mut socket = node.raw().await;

    socket
        .send(r#"{"action":"procesar_pago","requestId":1,"numeroCuenta":"ABC"}"#)
        .await;
    let reply = socket.next_response().await;
    assert_eq!(reply.request_id, Some(1));
    assert_eq!(reply.error.unwrap().code, ErrorKind::ValidationError);

    // String receipt ids are accepted.
    socket
        .send(r#"{"action":"procesar_pago","requestId":2,"idRecibo":"789","numeroCuenta":"ABC"}"#)
        .await;
    let reply = socket.next_response().await;
    assert_eq!(reply.message_type, "procesar_pago_response");
    assert_eq!(reply.request_id, Some(2));

    node.shutdown().await;
}

#[tokio::test]
async fn test_frame_far_over_limit_closes_connection() {
    let node = TestNode::start_with(|config| config.gateway.limits.max_message_size = 256).await;
    let mut socket = node.raw().await;

    let padding = "x".repeat(8 * 1024);
    socket
        .send(&format!(
            r#"{{"action":"ping","requestId":9,"padding":"{padding}"}}"#
        ))
        .await;
    socket.expect_closed().await;

    node.shutdown().await;
}

#[tokio::test]
async fn test_invalid_utf8_binary_frame_is_malformed() {
    let node = TestNode::start().await;
    let mut socket = node.raw().await;

    socket.send_binary(vec![b'{', 0xff, 0xfe, b'}']).await;
    let reply = socket.next_response().await;
    assert!(reply.request_id.is_none());
    assert_eq!(reply.error.unwrap().code, ErrorKind::MalformedMessage);

    socket
        .send_binary(br#"{"action":"ping","requestId":3}"#.to_vec())
        .await;
    assert_eq!(socket.next_response().await.request_id, Some(3));

    node.shutdown().await;
}

#[tokio::test]
async fn test_oversized_frame_is_rejected_without_closing() {
    let node = TestNode::start_with(|config| config.gateway.limits.max_message_size = 256).await;
    let mut socket = node.raw().await;

    // Over the limit but within what the transport still reads.
    let padding = "x".repeat(512);
    socket
        .send(&format!(
            r#"{{"action":"ping","requestId":9,"padding":"{padding}"}}"#
        ))
        .await;
    let reply = socket.next_response().await;
    assert!(reply.request_id.is_none());
    let error = reply.error.unwrap();
    assert_eq!(error.code, ErrorKind::ValidationError);
    assert_eq!(error.title, "Message too large");

    socket.send(r#"{"action":"ping","requestId":10}"#).await;
    assert_eq!(socket.next_response().await.request_id, Some(10));

    node.shutdown().await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let node = TestNode::start().await;

    let mut stream = TcpStream::connect(node.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut body = String::new();
    tokio::time::timeout(WAIT, stream.read_to_string(&mut body))
        .await
        .unwrap()
        .unwrap();

    assert!(body.starts_with("HTTP/1.1 200"));
    assert!(body.contains(r#""status":"ok""#));

    node.shutdown().await;
}
