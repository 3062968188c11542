//! Per-connection WebSocket loop.
//!
//! The socket is split: a writer task drains the connection's outbound queue
//! while the reader loop feeds frames to the registry one at a time, so
//! requests on one connection are handled in arrival order.

use crate::domain::{ConnectionId, RouteError};
use crate::metrics::GatewayMetrics;
use crate::registry::{ConnectionRegistry, Outbound};
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Serve one upgraded socket until the peer leaves, the heartbeat drops it
/// or the gateway shuts down.
pub async fn serve_connection(
    socket: WebSocket,
    remote_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<GatewayMetrics>,
    max_message_size: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let (id, outbound) = registry.accept(remote_addr);
    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(id.clone(), sink, outbound));

    loop {
        tokio::select! {
            _ = &mut writer => {
                debug!(connection_id = %id, "writer finished");
                break;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(connection_id = %id, "closing connection for shutdown");
                    break;
                }
            }
            frame = stream.next() => {
                let Some(frame) = frame else {
                    break;
                };
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(data)) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(connection_id = %id, error = %e, "binary frame is not UTF-8");
                            metrics.record_received();
                            metrics.record_error();
                            let reply = RouteError::malformed(format!(
                                "binary frame is not valid UTF-8: {e}"
                            ))
                            .to_response(None);
                            registry.send(&id, &reply);
                            continue;
                        }
                    },
                    Ok(Message::Pong(_)) => {
                        registry.mark_alive(&id);
                        continue;
                    }
                    // axum answers pings itself.
                    Ok(Message::Ping(_)) => continue,
                    Ok(Message::Close(_)) => {
                        debug!(connection_id = %id, "close frame received");
                        break;
                    }
                    Err(e) => {
                        warn!(connection_id = %id, error = %e, "WebSocket receive error");
                        break;
                    }
                };

                if text.len() > max_message_size {
                    warn!(
                        connection_id = %id,
                        size = text.len(),
                        max = max_message_size,
                        "Message exceeds size limit"
                    );
                    metrics.record_oversized();
                    metrics.record_error();
                    let reply = RouteError::message_too_large(text.len(), max_message_size)
                        .to_response(None);
                    registry.send(&id, &reply);
                    continue;
                }

                registry.dispatch(&id, &text).await;
            }
        }
    }

    // Dropping the registry entry drops the queue sender, which stops the writer.
    registry.remove(&id);
}

async fn write_loop(
    id: ConnectionId,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    while let Some(item) = outbound.recv().await {
        let message = match item {
            Outbound::Text(text) => Message::Text(text),
            Outbound::Ping => Message::Ping(Vec::new()),
            Outbound::Terminate => {
                debug!(connection_id = %id, "terminating connection");
                break;
            }
        };
        if let Err(e) = sink.send(message).await {
            error!(connection_id = %id, error = %e, "Failed to send WebSocket frame");
            return;
        }
    }
    let _ = sink.close().await;
}
