//! # Payment Gateway
//!
//! WebSocket front end of the receipt payment service.
//!
//! ```text
//! ┌────────────────────────── rp-02-gateway ──────────────────────────┐
//! │  axum  GET /  ──upgrade──> ws::serve_connection (reader + writer) │
//! │        GET /health, GET /stats                                    │
//! │                          │                                        │
//! │                 ConnectionRegistry ── heartbeat_task (sweep)      │
//! │                          │                                        │
//! │                    RequestRouter                                  │
//! └──────────────────────────┼────────────────────────────────────────┘
//!                            ▼
//!                  rp-01-ledger (LedgerApi)
//! ```
//!
//! Every inbound frame gets at most one direct reply, echoing its
//! `requestId`. Payments are announced to all clients with
//! `pago_procesado`; consultations to the other clients with
//! `recibo_consultado`.
//!
//! A connection that misses a whole heartbeat interval without answering the
//! transport ping is terminated on the next sweep.
//!
//! # Usage
//!
//! ```ignore
//! use rp_02_gateway::{GatewayConfig, GatewayService};
//!
//! let mut service = GatewayService::new(GatewayConfig::default(), ledger)?;
//! let addr = service.start().await?;
//! ```

pub mod domain;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod service;
pub mod ws;

pub use domain::{
    ConfigError, ConnectionId, ConnectionInfo, GatewayConfig, GatewayError, HeartbeatConfig,
    LimitsConfig, RouteError, WebSocketConfig,
};
pub use metrics::GatewayMetrics;
pub use registry::{
    heartbeat_task, ClientStats, ConnectionRegistry, Outbound, RegistryStats, SweepReport,
};
pub use router::{Broadcast, RequestRouter, RouteOutcome};
pub use service::GatewayService;
