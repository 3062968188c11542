//! Gateway service - binds the WebSocket server and owns its background tasks.

use crate::domain::{GatewayConfig, GatewayError};
use crate::metrics::GatewayMetrics;
use crate::registry::{heartbeat_task, ConnectionRegistry};
use crate::router::RequestRouter;
use crate::ws::serve_connection;
use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rp_01_ledger::LedgerApi;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Payment gateway service state
pub struct GatewayService {
    config: GatewayConfig,
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<GatewayMetrics>,
    shutdown_tx: watch::Sender<bool>,
    local_addr: Option<SocketAddr>,
    server: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl GatewayService {
    /// Create a new gateway over `ledger`.
    pub fn new(config: GatewayConfig, ledger: Arc<dyn LedgerApi>) -> Result<Self, GatewayError> {
        config.validate()?;

        let metrics = Arc::new(GatewayMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(
            RequestRouter::new(ledger),
            Arc::clone(&metrics),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            registry,
            metrics,
            shutdown_tx,
            local_addr: None,
            server: None,
            heartbeat: None,
        })
    }

    /// Bind the listener and start serving. Returns the bound address, which
    /// differs from the configured one when port 0 was requested.
    pub async fn start(&mut self) -> Result<SocketAddr, GatewayError> {
        if self.local_addr.is_some() {
            return Err(GatewayError::AlreadyStarted);
        }

        let listener = tokio::net::TcpListener::bind(self.config.ws_addr())
            .await
            .map_err(GatewayError::Bind)?;
        let addr = listener.local_addr().map_err(GatewayError::Bind)?;
        self.local_addr = Some(addr);

        self.heartbeat = Some(tokio::spawn(heartbeat_task(
            Arc::clone(&self.registry),
            self.config.heartbeat.interval,
            self.shutdown_tx.subscribe(),
        )));

        let router = self.router();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.server = Some(tokio::spawn(async move {
            let result = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await;
            if let Err(e) = result {
                error!(error = %e, "WebSocket server error");
            }
        }));

        info!(
            addr = %addr,
            heartbeat = ?self.config.heartbeat.interval,
            max_message_size = self.config.limits.max_message_size,
            "Payment gateway listening"
        );
        Ok(addr)
    }

    /// Signal every task to stop and wait for the server to drain.
    pub async fn shutdown(&mut self) {
        self.shutdown_tx.send_replace(true);

        if let Some(server) = self.server.take() {
            if let Err(e) = server.await {
                error!(error = %e, "server task failed");
            }
        }
        if let Some(heartbeat) = self.heartbeat.take() {
            let _ = heartbeat.await;
        }
        info!("Payment gateway stopped");
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Bound address once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// HTTP routes: `/` upgrades to WebSocket, `/health` and `/stats` report.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
            max_message_size: self.config.limits.max_message_size,
            shutdown: self.shutdown_tx.subscribe(),
        };

        Router::new()
            .route("/", get(ws_upgrade))
            .route("/health", get(health_check))
            .route("/stats", get(stats))
            .with_state(state)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<GatewayMetrics>,
    max_message_size: usize,
    shutdown: watch::Receiver<bool>,
}

/// Frames up to this many times the configured limit are read and answered
/// with an error; anything larger is refused by the transport and closes the
/// connection.
const TRANSPORT_LIMIT_FACTOR: usize = 4;

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let transport_limit = state.max_message_size.saturating_mul(TRANSPORT_LIMIT_FACTOR);
    ws.max_message_size(transport_limit)
        .max_frame_size(transport_limit)
        .on_upgrade(move |socket| {
            serve_connection(
                socket,
                remote,
                state.registry,
                state.metrics,
                state.max_message_size,
                state.shutdown,
            )
        })
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "payment-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "registry": state.registry.stats(),
        "metrics": state.metrics.to_json(),
    }))
}
