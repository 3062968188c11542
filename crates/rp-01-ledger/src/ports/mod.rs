//! Ports (hexagonal architecture).

pub mod inbound;
pub mod outbound;

pub use inbound::{LedgerApi, DEFAULT_HISTORY_LIMIT, DEFAULT_RECEIPT_HISTORY_LIMIT};
pub use outbound::{FixedTimeSource, LedgerStore, LedgerTransaction, SystemTimeSource, TimeSource};
