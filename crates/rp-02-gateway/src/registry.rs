//! Connection Registry
//!
//! Tracks live connections, dispatches their messages through the router,
//! fans events out and runs the liveness sweep.
//!
//! Each connection owns an outbound queue drained by its writer task. The
//! registry never writes to a socket directly, so a slow or broken peer can
//! only affect its own queue.

use crate::domain::{ConnectionId, ConnectionInfo};
use crate::metrics::GatewayMetrics;
use crate::router::{Broadcast, RequestRouter};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use shared_types::{EventType, RawRequest, Response};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Item queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Encoded envelope to send as a text frame.
    Text(String),
    /// Transport-level ping probe.
    Ping,
    /// Close the transport without further writes.
    Terminate,
}

struct Connection {
    info: ConnectionInfo,
    alive: AtomicBool,
    tx: mpsc::UnboundedSender<Outbound>,
}

/// Outcome of one heartbeat sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections that were sent a ping probe.
    pub probed: usize,
    /// Connections dropped for missing the previous probe.
    pub terminated: usize,
}

/// Per-connection entry of [`RegistryStats`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub id: ConnectionId,
    pub ip: String,
    pub connected_at: DateTime<Utc>,
    pub uptime_ms: i64,
}

/// Snapshot of the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_clients: usize,
    pub connected_clients: Vec<ClientStats>,
}

pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Connection>,
    router: RequestRouter,
    metrics: Arc<GatewayMetrics>,
}

impl ConnectionRegistry {
    pub fn new(router: RequestRouter, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            connections: DashMap::new(),
            router,
            metrics,
        }
    }

    /// Register a new connection and queue its welcome event.
    pub fn accept(&self, remote_addr: SocketAddr) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let connected_at = Utc::now();
        let id = ConnectionId::generate(connected_at);
        let (tx, rx) = mpsc::unbounded_channel();

        self.connections.insert(
            id.clone(),
            Connection {
                info: ConnectionInfo {
                    id: id.clone(),
                    remote_addr,
                    connected_at,
                },
                alive: AtomicBool::new(true),
                tx,
            },
        );
        self.metrics.record_connect();
        info!(connection_id = %id, remote = %remote_addr, "client connected");

        let welcome = Response::event(
            EventType::ConnectionEstablished,
            json!({
                "clientId": id,
                "message": "Connected to the payment server",
            }),
        );
        self.send(&id, &welcome);

        (id, rx)
    }

    /// Decode, route and answer one inbound text frame.
    ///
    /// Never fails: every problem becomes an error envelope for the sender.
    pub async fn dispatch(&self, id: &ConnectionId, raw: &str) {
        self.metrics.record_received();

        let request = match RawRequest::parse(raw) {
            Ok(request) => request,
            Err(failure) => {
                warn!(connection_id = %id, error = %failure, "rejected inbound message");
                let response = Response::failure(
                    failure.request_id,
                    failure.error.kind(),
                    failure.error.title(),
                    failure.error.to_string(),
                );
                self.metrics.record_error();
                self.send(id, &response);
                return;
            }
        };

        debug!(
            connection_id = %id,
            action = %request.action,
            request_id = ?request.request_id,
            "dispatching request"
        );

        match self
            .router
            .route(id, request.action, &request.params)
            .await
        {
            Ok(outcome) => {
                let reply = Response::success(request.action, request.request_id, outcome.data);
                self.send(id, &reply);
                match outcome.broadcast {
                    Some(Broadcast::All(event)) => {
                        self.broadcast(&event);
                    }
                    Some(Broadcast::Others(event)) => {
                        self.broadcast_except(id, &event);
                    }
                    None => {}
                }
            }
            Err(err) => {
                warn!(
                    connection_id = %id,
                    action = %request.action,
                    kind = %err.kind,
                    message = %err.message,
                    "request failed"
                );
                self.metrics.record_error();
                self.send(id, &err.to_response(request.request_id));
            }
        }
    }

    /// Queue `response` for one connection. Returns `false` if the
    /// connection is unknown or its writer is gone.
    pub fn send(&self, id: &ConnectionId, response: &Response) -> bool {
        let Some(text) = encode(response) else {
            return false;
        };
        let Some(conn) = self.connections.get(id) else {
            debug!(connection_id = %id, "send to unknown connection ignored");
            return false;
        };
        let sent = conn.tx.send(Outbound::Text(text)).is_ok();
        if sent {
            self.metrics.record_sent(1);
        }
        sent
    }

    /// Queue `response` for every open connection. Returns the number of
    /// connections it was queued for.
    pub fn broadcast(&self, response: &Response) -> usize {
        self.fan_out(response, None)
    }

    /// Like [`broadcast`](Self::broadcast) but skipping `excluded`.
    pub fn broadcast_except(&self, excluded: &ConnectionId, response: &Response) -> usize {
        self.fan_out(response, Some(excluded))
    }

    fn fan_out(&self, response: &Response, excluded: Option<&ConnectionId>) -> usize {
        let Some(text) = encode(response) else {
            return 0;
        };
        let delivered = self
            .connections
            .iter()
            .filter(|entry| Some(entry.key()) != excluded)
            .filter(|entry| entry.tx.send(Outbound::Text(text.clone())).is_ok())
            .count();

        self.metrics.record_broadcast();
        self.metrics.record_sent(delivered as u64);
        debug!(event = %response.message_type, delivered, "event broadcast");
        delivered
    }

    /// Record a transport pong from `id`.
    pub fn mark_alive(&self, id: &ConnectionId) {
        if let Some(conn) = self.connections.get(id) {
            conn.alive.store(true, Ordering::Release);
        }
    }

    /// One liveness pass.
    ///
    /// A connection that has not answered the previous probe is terminated
    /// and removed; every other connection is marked not-alive and probed.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let mut dead = Vec::new();

        for entry in self.connections.iter() {
            if entry.alive.swap(false, Ordering::AcqRel) {
                if entry.tx.send(Outbound::Ping).is_ok() {
                    report.probed += 1;
                }
            } else {
                dead.push(entry.key().clone());
            }
        }

        for id in dead {
            if let Some((_, conn)) = self.connections.remove(&id) {
                let _ = conn.tx.send(Outbound::Terminate);
                self.metrics.record_terminated();
                self.metrics.record_disconnect();
                report.terminated += 1;
                info!(connection_id = %id, "terminated unresponsive client");
            }
        }

        report
    }

    /// Forget a connection after close or transport error.
    pub fn remove(&self, id: &ConnectionId) -> Option<ConnectionInfo> {
        let (_, conn) = self.connections.remove(id)?;
        self.metrics.record_disconnect();
        info!(connection_id = %id, "client disconnected");
        Some(conn.info)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let now = Utc::now();
        let connected_clients: Vec<ClientStats> = self
            .connections
            .iter()
            .map(|entry| ClientStats {
                id: entry.info.id.clone(),
                ip: entry.info.remote_addr.ip().to_string(),
                connected_at: entry.info.connected_at,
                uptime_ms: (now - entry.info.connected_at).num_milliseconds(),
            })
            .collect();

        RegistryStats {
            total_clients: connected_clients.len(),
            connected_clients,
        }
    }
}

fn encode(response: &Response) -> Option<String> {
    match response.encode() {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = %e, "failed to encode response");
            None
        }
    }
}

/// Run [`ConnectionRegistry::sweep`] every `interval` until shutdown.
pub async fn heartbeat_task(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = registry.sweep();
                if report.terminated > 0 {
                    info!(probed = report.probed, terminated = report.terminated, "heartbeat sweep");
                } else {
                    debug!(probed = report.probed, "heartbeat sweep");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("heartbeat task stopped");
}
