//! # Inbound Port - LedgerApi
//!
//! Driving port used by the request router. Every method either returns a
//! wire-ready read model or a [`LedgerError`] that maps onto an error kind.

use crate::domain::LedgerError;
use async_trait::async_trait;
use shared_types::{
    AccountId, AccountValidation, AccountsSummary, BalanceSummary, Money, PaidReceipt,
    PaymentResult, PendingReceipts, ReceiptHistory, ReceiptId, ReceiptStatistics, RechargeResult,
    TransactionHistory,
};

/// Default number of records returned by [`LedgerApi::transaction_history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Default number of receipts returned by [`LedgerApi::receipt_history`].
pub const DEFAULT_RECEIPT_HISTORY_LIMIT: usize = 10;

#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Pending receipts with totals and urgency.
    ///
    /// # Errors
    /// - `AccountNotFound`
    async fn pending_receipts(&self, account: &AccountId) -> Result<PendingReceipts, LedgerError>;

    /// Pay one receipt from the account balance, atomically.
    ///
    /// `payment_method` defaults to `"Saldo en cuenta"`.
    ///
    /// # Errors
    /// - `ReceiptNotFound`, `AlreadyPaid`
    /// - `AccountNotFound`, `AccountInactive`, `InsufficientFunds`
    /// - `Storage` if the write transaction fails (nothing is applied)
    async fn process_payment(
        &self,
        receipt: ReceiptId,
        account: &AccountId,
        payment_method: Option<String>,
    ) -> Result<PaymentResult, LedgerError>;

    /// A receipt that has been paid, with payment details.
    ///
    /// # Errors
    /// - `ReceiptNotFound` if absent or still pending
    async fn paid_receipt(
        &self,
        receipt: ReceiptId,
        account: &AccountId,
    ) -> Result<PaidReceipt, LedgerError>;

    async fn balance(&self, account: &AccountId) -> Result<BalanceSummary, LedgerError>;

    /// Credit the account.
    ///
    /// # Errors
    /// - `Validation` if `amount <= 0`
    /// - `AccountNotFound`, `AccountInactive`, `Storage`
    async fn recharge(
        &self,
        account: &AccountId,
        amount: Money,
        description: Option<String>,
    ) -> Result<RechargeResult, LedgerError>;

    /// Most recent ledger records, newest first.
    async fn transaction_history(
        &self,
        account: &AccountId,
        limit: usize,
    ) -> Result<TransactionHistory, LedgerError>;

    /// Receipts of any status, most recently issued first. `totalRecibos`
    /// counts every receipt, not only the returned ones.
    ///
    /// # Errors
    /// - `AccountNotFound`
    async fn receipt_history(
        &self,
        account: &AccountId,
        limit: usize,
    ) -> Result<ReceiptHistory, LedgerError>;

    /// Pending/paid counts and amounts with the average paid amount.
    ///
    /// # Errors
    /// - `AccountNotFound`
    async fn receipt_statistics(&self, account: &AccountId)
        -> Result<ReceiptStatistics, LedgerError>;

    /// Existence and status check. An unknown account is a regular answer
    /// with `existe: false`, not an error.
    async fn validate_account(&self, account: &AccountId)
        -> Result<AccountValidation, LedgerError>;

    /// Totals across every stored account.
    async fn accounts_summary(&self) -> Result<AccountsSummary, LedgerError>;
}
