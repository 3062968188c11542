//! # Transaction Processor
//!
//! Applies receipt payments and account recharges atomically, and serves the
//! read models behind the query actions.
//!
//! ## Payment Flow
//!
//! ```text
//! lock(account) ──> load receipt ──> load account ──> begin
//!                     │ NotFound        │ NotFound          │
//!                     │ AlreadyPaid     │ AccountInactive   ├─ set balance
//!                                       │ InsufficientFunds ├─ append payment record
//!                                                           ├─ mark receipt paid
//!                                                           └─ commit (rollback on any failure)
//! ```
//!
//! ## Invariants
//!
//! - A balance never goes below zero.
//! - A receipt moves `pending -> paid` at most once.
//! - Balance change, log record and receipt status commit together or not at
//!   all.
//! - Mutations on one account are serialized; different accounts proceed in
//!   parallel.
//!
//! ## Module Structure
//!
//! - `domain/` - entities, errors, due-date rules, lock table, read models
//! - `ports/` - `LedgerApi` (inbound), `LedgerStore`/`LedgerTransaction`/`TimeSource` (outbound)
//! - `adapters/` - in-memory store
//! - `service` - `LedgerService`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FailPoint, InMemoryLedgerStore};
pub use domain::{
    Account, LedgerError, Receipt, ReceiptPayment, StoreError, TransactionRecord,
    DEFAULT_PAYMENT_METHOD,
};
pub use ports::{
    FixedTimeSource, LedgerApi, LedgerStore, LedgerTransaction, SystemTimeSource, TimeSource,
    DEFAULT_HISTORY_LIMIT, DEFAULT_RECEIPT_HISTORY_LIMIT,
};
pub use service::LedgerService;
