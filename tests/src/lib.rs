//! # Receipt Payment Service Test Suite
//!
//! End-to-end tests running the gateway on a loopback port with a seeded
//! ledger, driven by the correlation client and by raw WebSocket frames.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs    # Gateway + client fixtures
//!     ├── flows.rs      # Request/reply flows through the client
//!     └── broadcast.rs  # Fan-out events and raw-frame handling
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rp-tests
//! cargo test -p rp-tests integration::broadcast::
//! ```

pub mod integration;
