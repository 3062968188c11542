//! Node runtime: wires the ledger into the gateway and owns its lifecycle.

use crate::config::NodeConfig;
use crate::seed::seed_demo_data;
use anyhow::{Context, Result};
use chrono::Utc;
use rp_01_ledger::{InMemoryLedgerStore, LedgerService};
use rp_02_gateway::GatewayService;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// The payment service process.
pub struct NodeRuntime {
    store: Arc<InMemoryLedgerStore>,
    gateway: GatewayService,
}

impl NodeRuntime {
    /// Build the ledger (seeding it if configured) and the gateway.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let store = Arc::new(InMemoryLedgerStore::new());
        if config.seed.demo_data {
            seed_demo_data(&store, Utc::now()).context("failed to seed demo data")?;
        }

        let ledger = Arc::new(LedgerService::new(Arc::clone(&store)));
        let gateway = GatewayService::new(config.gateway, ledger)
            .context("invalid gateway configuration")?;

        Ok(Self { store, gateway })
    }

    /// Start serving. Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        info!("===========================================");
        info!("  Receipt Payment Service v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let addr = self
            .gateway
            .start()
            .await
            .context("failed to start gateway")?;
        info!(addr = %addr, "Node is ready");
        Ok(addr)
    }

    /// Shutdown the node gracefully.
    pub async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");
        self.gateway.shutdown().await;
        info!("Shutdown complete");
    }

    pub fn gateway(&self) -> &GatewayService {
        &self.gateway
    }

    pub fn store(&self) -> Arc<InMemoryLedgerStore> {
        Arc::clone(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.gateway.websocket.host = "127.0.0.1".parse().unwrap();
        config.gateway.websocket.port = 0;
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut runtime = NodeRuntime::new(local_config()).unwrap();
        let addr = runtime.start().await.unwrap();
        assert_eq!(runtime.gateway().local_addr(), Some(addr));
        assert_eq!(runtime.store().record_count(), 0);
        runtime.shutdown().await;
    }

    #[test]
    fn test_invalid_gateway_config_is_rejected() {
        let mut config = local_config();
        config.gateway.limits.max_message_size = 0;
        assert!(NodeRuntime::new(config).is_err());
    }
}
