//! Outbound (driven) ports of the transaction processor.
//!
//! The storage engine is reached only through these traits. Writes happen
//! inside a [`LedgerTransaction`]: nothing staged on it is visible to
//! readers until `commit`, and `rollback` discards everything.

use crate::domain::{Account, Receipt, ReceiptPayment, RecordDraft, StoreError, TransactionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{AccountId, Money, ReceiptId, TransactionId};

/// Parameterized reads plus transaction creation.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn account(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Receipt `id` if it belongs to `account`.
    async fn receipt(
        &self,
        id: ReceiptId,
        account: &AccountId,
    ) -> Result<Option<Receipt>, StoreError>;

    /// Pending receipts of `account`, earliest due date first.
    async fn pending_receipts(&self, account: &AccountId) -> Result<Vec<Receipt>, StoreError>;

    /// Every receipt of `account`, most recently issued first.
    async fn receipts(&self, account: &AccountId) -> Result<Vec<Receipt>, StoreError>;

    async fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Up to `limit` records of `account`, newest first.
    async fn transactions(
        &self,
        account: &AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError>;
}

/// A unit of work with staged writes.
///
/// After `commit` or `rollback` returns, every further call fails with
/// [`StoreError::Closed`].
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn set_balance(&mut self, account: &AccountId, balance: Money)
        -> Result<(), StoreError>;

    /// Stage a log record. The id is reserved immediately.
    async fn append_record(&mut self, draft: RecordDraft) -> Result<TransactionId, StoreError>;

    async fn mark_paid(
        &mut self,
        receipt: ReceiptId,
        payment: ReceiptPayment,
    ) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Clock used for payment timestamps and due-date arithmetic.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a settable instant.
#[derive(Debug)]
pub struct FixedTimeSource {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

impl FixedTimeSource {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: parking_lot::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
