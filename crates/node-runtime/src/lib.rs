//! # Receipt Payment Service Runtime
//!
//! Process bootstrap for the payment service.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`RP_CONFIG` TOML file, then `RP_*` env overrides)
//! 2. Create the in-memory ledger and seed the demo data
//! 3. Start the WebSocket gateway and its heartbeat sweep
//! 4. Run until Ctrl+C, then shut the gateway down gracefully
//!
//! ## Modular Structure
//!
//! - `config` - node configuration and env overrides
//! - `seed` - demo accounts and receipts
//! - `runtime` - `NodeRuntime` wiring ledger and gateway

pub mod config;
pub mod runtime;
pub mod seed;

pub use config::{apply_env_overrides, load_config, ConfigError, NodeConfig, SeedConfig};
pub use runtime::NodeRuntime;
pub use seed::{seed_demo_data, SeedError, SeedSummary};
