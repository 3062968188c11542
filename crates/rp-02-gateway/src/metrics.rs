//! Gateway counters exposed on `/stats`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Connection counters
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_terminated: AtomicU64,

    // Message counters
    pub messages_received: AtomicU64,
    pub messages_sent: AtomicU64,
    pub errors_sent: AtomicU64,
    pub oversized_rejected: AtomicU64,

    // Fan-out counters
    pub broadcasts: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connect(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Connection dropped by the heartbeat sweep.
    pub fn record_terminated(&self) {
        self.connections_terminated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized(&self) {
        self.oversized_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "connections": {
                "total": self.connections_total.load(Ordering::Relaxed),
                "active": self.connections_active.load(Ordering::Relaxed),
                "terminated": self.connections_terminated.load(Ordering::Relaxed),
            },
            "messages": {
                "received": self.messages_received.load(Ordering::Relaxed),
                "sent": self.messages_sent.load(Ordering::Relaxed),
                "errors": self.errors_sent.load(Ordering::Relaxed),
                "oversized": self.oversized_rejected.load(Ordering::Relaxed),
            },
            "broadcasts": self.broadcasts.load(Ordering::Relaxed),
        })
    }
}
