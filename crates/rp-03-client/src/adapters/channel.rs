//! In-process transport for tests and embedding.
//!
//! Each successful `connect` hands the far end of the new connection to
//! whoever holds the accept receiver, which then plays the gateway.

use crate::ports::{Connector, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::Response;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Gateway side of one in-process connection.
pub struct ServerEnd {
    pub from_client: mpsc::UnboundedReceiver<String>,
    pub to_client: mpsc::UnboundedSender<String>,
}

impl ServerEnd {
    /// Next frame from the client, parsed as JSON. `None` once the client
    /// closed the connection.
    pub async fn next_frame(&mut self) -> Option<Value> {
        let text = self.from_client.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// Next frame that carries a `requestId`, skipping keep-alive pings.
    pub async fn next_request(&mut self) -> Option<Value> {
        loop {
            let frame = self.next_frame().await?;
            if frame.get("requestId").is_some() {
                return Some(frame);
            }
        }
    }

    pub fn send(&self, response: &Response) -> bool {
        match response.encode() {
            Ok(text) => self.to_client.send(text).is_ok(),
            Err(_) => false,
        }
    }

    pub fn send_raw(&self, text: impl Into<String>) -> bool {
        self.to_client.send(text.into()).is_ok()
    }
}

#[derive(Default)]
struct Shared {
    attempts: AtomicU32,
    refusals: AtomicU32,
}

/// Connector backed by in-process channels.
#[derive(Clone)]
pub struct ChannelConnector {
    accepted: mpsc::UnboundedSender<ServerEnd>,
    shared: Arc<Shared>,
}

impl ChannelConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted, accept_rx) = mpsc::unbounded_channel();
        (
            Self {
                accepted,
                shared: Arc::new(Shared::default()),
            },
            accept_rx,
        )
    }

    /// Fail the next `count` connection attempts.
    pub fn refuse_next(&self, count: u32) {
        self.shared.refusals.store(count, Ordering::SeqCst);
    }

    /// Connection attempts so far, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, _url: &str) -> Result<Transport, TransportError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .shared
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError("connection refused".into()));
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        self.accepted
            .send(ServerEnd {
                from_client: out_rx,
                to_client: in_tx,
            })
            .map_err(|_| TransportError("no server listening".into()))?;

        Ok(Transport {
            outgoing: out_tx,
            incoming: in_rx,
        })
    }
}
