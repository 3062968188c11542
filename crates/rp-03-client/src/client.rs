//! Correlation client.
//!
//! Turns the asynchronous reply stream into "submit and await" calls. Each
//! call gets a fresh id, is recorded in the pending store and completes on
//! exactly one of: matching reply, timeout, stale discard on reconnect.

use crate::domain::reply::settle;
use crate::domain::{
    backoff_delay, ClientConfig, ClientError, ClientEvent, ConnectionSnapshot,
    ConnectionState, PendingCalls, PendingStats, Reply, ResendPlan,
};
use crate::ports::{Connector, Transport};
use parking_lot::Mutex;
use shared_types::{
    AccountId, BalanceSummary, PaidReceipt, PaymentResult, PendingReceipts, ReceiptId, Request,
    RequestEnvelope, Response,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Method sent when `procesar_pago` is called without one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Saldo en cuenta";

const EVENT_CAPACITY: usize = 256;

/// Mutable connection bookkeeping, guarded by one lock.
struct Link {
    state: ConnectionState,
    /// Consecutive failed attempts since the last successful open.
    failures: u32,
    /// Bumped on every open and every explicit connect/disconnect, so tasks
    /// of an older connection can tell they were superseded.
    generation: u64,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    /// Dropping it stops the current connection task.
    close_tx: Option<oneshot::Sender<()>>,
}

struct Inner<C> {
    config: ClientConfig,
    connector: C,
    next_id: AtomicU64,
    pending: PendingCalls,
    link: Mutex<Link>,
    events: broadcast::Sender<ClientEvent>,
}

pub struct CorrelationClient<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for CorrelationClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> CorrelationClient<C> {
    pub fn new(config: ClientConfig, connector: C) -> Result<Self, ClientError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                connector,
                next_id: AtomicU64::new(1),
                pending: PendingCalls::new(),
                link: Mutex::new(Link {
                    state: ConnectionState::Disconnected,
                    failures: 0,
                    generation: 0,
                    outgoing: None,
                    close_tx: None,
                }),
                events,
            }),
        })
    }

    /// Lifecycle and server events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Open the transport. No-op while connecting or connected.
    ///
    /// On failure a reconnect is scheduled and `ConnectFailed` returned.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let generation = {
            let mut link = self.inner.link.lock();
            if matches!(
                link.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                debug!(state = %link.state, "connect ignored");
                return Ok(());
            }
            link.state = ConnectionState::Connecting;
            link.failures = 0;
            link.generation += 1;
            link.generation
        };

        match self.inner.open(generation).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(url = %self.inner.config.url, error = %e, "connect failed");
                if self.inner.record_failure(generation) {
                    tokio::spawn(reconnect_loop(Arc::clone(&self.inner), generation));
                }
                Err(e)
            }
        }
    }

    /// Close on purpose: no reconnect. Pending calls run out their own
    /// timers.
    pub fn disconnect(&self) {
        let previous = {
            let mut link = self.inner.link.lock();
            let previous = link.state;
            link.state = ConnectionState::Disconnected;
            link.generation += 1;
            link.failures = 0;
            link.outgoing = None;
            link.close_tx = None;
            previous
        };

        if previous != ConnectionState::Disconnected {
            info!(previous = %previous, "disconnected");
            self.inner.emit(ClientEvent::Disconnected { intentional: true });
        }
    }

    /// Send `request` and wait for its reply.
    pub async fn call(&self, request: Request) -> Result<Reply, ClientError> {
        let inner = &self.inner;
        let action = request.action();
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let text = RequestEnvelope::new(&request, Some(id)).encode()?;

        let Some(outgoing) = inner.outgoing() else {
            debug!(request_id = id, action = %action, "call rejected: not connected");
            return Err(ClientError::NotConnected);
        };

        let mut rx = inner.pending.register(id, request);
        if outgoing.send(text).is_err() {
            inner.pending.cancel(id);
            return Err(ClientError::NotConnected);
        }

        match tokio::time::timeout(inner.config.call_timeout, &mut rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => {
                if inner.pending.expire(id) {
                    Err(ClientError::Timeout {
                        request_id: id,
                        action,
                    })
                } else {
                    // Completed concurrently with the timer; take that outcome.
                    rx.await.unwrap_or(Err(ClientError::Closed))
                }
            }
        }
    }

    pub async fn consultar_recibo(&self, account: &AccountId) -> Result<PendingReceipts, ClientError> {
        self.call(Request::ConsultarRecibo {
            numero_cuenta: account.clone(),
        })
        .await?
        .into_data()
    }

    pub async fn procesar_pago(
        &self,
        receipt: ReceiptId,
        account: &AccountId,
        method: Option<&str>,
    ) -> Result<PaymentResult, ClientError> {
        self.call(Request::ProcesarPago {
            id_recibo: receipt,
            numero_cuenta: account.clone(),
            metodo_pago: Some(method.unwrap_or(DEFAULT_PAYMENT_METHOD).to_string()),
        })
        .await?
        .into_data()
    }

    pub async fn obtener_recibo(
        &self,
        receipt: ReceiptId,
        account: &AccountId,
    ) -> Result<PaidReceipt, ClientError> {
        self.call(Request::ObtenerRecibo {
            id_recibo: receipt,
            numero_cuenta: account.clone(),
        })
        .await?
        .into_data()
    }

    pub async fn obtener_saldo(&self, account: &AccountId) -> Result<BalanceSummary, ClientError> {
        self.call(Request::ObtenerSaldo {
            numero_cuenta: account.clone(),
        })
        .await?
        .into_data()
    }

    pub async fn ping(&self) -> Result<Reply, ClientError> {
        self.call(Request::Ping).await
    }

    pub fn connection_state(&self) -> ConnectionSnapshot {
        let link = self.inner.link.lock();
        ConnectionSnapshot {
            state: link.state,
            reconnect_attempts: link.failures,
            pending_calls: self.inner.pending.pending_count(),
        }
    }

    pub fn pending_stats(&self) -> &PendingStats {
        self.inner.pending.stats()
    }
}

impl<C: Connector> Inner<C> {
    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn outgoing(&self) -> Option<mpsc::UnboundedSender<String>> {
        let link = self.link.lock();
        match link.state {
            ConnectionState::Connected => link.outgoing.clone(),
            _ => None,
        }
    }

    fn still_connecting(&self, generation: u64) -> bool {
        let link = self.link.lock();
        link.generation == generation && link.state == ConnectionState::Connecting
    }

    /// One connection attempt on behalf of `generation`.
    async fn open(self: &Arc<Self>, generation: u64) -> Result<(), ClientError> {
        if !self.still_connecting(generation) {
            return Err(ClientError::NotConnected);
        }

        let Transport { outgoing, incoming } = self
            .connector
            .connect(&self.config.url)
            .await
            .map_err(|e| ClientError::ConnectFailed(e.to_string()))?;

        let (close_tx, close_rx) = oneshot::channel();
        let (connection, plan) = {
            let mut link = self.link.lock();
            if link.generation != generation || link.state != ConnectionState::Connecting {
                // Superseded while the transport was opening.
                return Err(ClientError::NotConnected);
            }
            // Calls only register once they see `Connected`, so the plan
            // holds exactly the calls left over from the previous link.
            let plan = self.pending.plan_resend(self.config.stale_after);
            link.generation += 1;
            link.state = ConnectionState::Connected;
            link.failures = 0;
            link.outgoing = Some(outgoing.clone());
            link.close_tx = Some(close_tx);
            (link.generation, plan)
        };

        info!(url = %self.config.url, "connected to gateway");
        tokio::spawn(connection_task(
            Arc::clone(self),
            connection,
            incoming,
            close_rx,
        ));
        replay(&outgoing, plan);
        self.emit(ClientEvent::Connected);
        Ok(())
    }

    /// Count a failed attempt. Returns true if another attempt should be
    /// scheduled.
    fn record_failure(&self, generation: u64) -> bool {
        let mut link = self.link.lock();
        if link.generation != generation || link.state != ConnectionState::Connecting {
            return false;
        }
        link.failures += 1;
        if link.failures < self.config.reconnect.max_retries {
            return true;
        }

        link.state = ConnectionState::GaveUp;
        let failures = link.failures;
        drop(link);
        warn!(failures, "giving up on reconnecting");
        self.emit(ClientEvent::GaveUp);
        false
    }

    fn handle_frame(&self, text: &str) {
        let response = match Response::decode(text) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "undecodable frame dropped");
                return;
            }
        };

        match response.request_id {
            Some(id) => {
                self.pending.complete(id, settle(id, response));
            }
            None => {
                debug!(event = %response.message_type, "server event");
                self.emit(ClientEvent::Server(response));
            }
        }
    }

    fn send_heartbeat(&self, connection: u64) {
        let outgoing = {
            let link = self.link.lock();
            if link.generation != connection {
                return;
            }
            link.outgoing.clone()
        };
        let Some(outgoing) = outgoing else {
            return;
        };
        match RequestEnvelope::new(&Request::Ping, None).encode() {
            Ok(text) => {
                if outgoing.send(text).is_ok() {
                    debug!("heartbeat sent");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode heartbeat"),
        }
    }

    /// The transport of `connection` went away without `disconnect()`.
    fn handle_close(self: &Arc<Self>, connection: u64) {
        {
            let mut link = self.link.lock();
            if link.generation != connection || link.state != ConnectionState::Connected {
                return;
            }
            link.state = ConnectionState::Connecting;
            link.failures = 0;
            link.outgoing = None;
            link.close_tx = None;
        }

        warn!(pending = self.pending.pending_count(), "connection lost");
        self.emit(ClientEvent::Disconnected { intentional: false });
        tokio::spawn(reconnect_loop(Arc::clone(self), connection));
    }
}

/// Send the calls left over from the previous link, oldest first.
fn replay(outgoing: &mpsc::UnboundedSender<String>, plan: ResendPlan) {
    if plan.resend.is_empty() && plan.discarded == 0 {
        return;
    }
    let resent = plan
        .resend
        .iter()
        .filter_map(|(id, request)| RequestEnvelope::new(request, Some(*id)).encode().ok())
        .filter(|text| outgoing.send(text.clone()).is_ok())
        .count();
    info!(resent, discarded = plan.discarded, "replayed pending calls");
}

/// Reads frames and sends keep-alive pings for one open transport.
async fn connection_task<C: Connector>(
    inner: Arc<Inner<C>>,
    connection: u64,
    mut incoming: mpsc::UnboundedReceiver<String>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let mut heartbeat = tokio::time::interval(inner.config.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            frame = incoming.recv() => match frame {
                Some(text) => inner.handle_frame(&text),
                None => break,
            },
            _ = heartbeat.tick() => inner.send_heartbeat(connection),
            _ = &mut close_rx => {
                debug!("connection closed locally");
                return;
            }
        }
    }

    inner.handle_close(connection);
}

/// Retry until connected, superseded or out of attempts.
///
/// Boxed so the connection task can spawn it without a recursive future type.
fn reconnect_loop<C: Connector>(
    inner: Arc<Inner<C>>,
    generation: u64,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        loop {
            let failures = {
                let link = inner.link.lock();
                if link.generation != generation || link.state != ConnectionState::Connecting {
                    return;
                }
                link.failures
            };

            let policy = &inner.config.reconnect;
            let delay = backoff_delay(policy.base_delay, policy.max_delay, failures);
            info!(attempt = failures + 1, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
            inner.emit(ClientEvent::Reconnecting {
                attempt: failures + 1,
                delay,
            });
            tokio::time::sleep(delay).await;

            match inner.open(generation).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(error = %e, "reconnect attempt failed");
                    if !inner.record_failure(generation) {
                        return;
                    }
                }
            }
        }
    })
}
