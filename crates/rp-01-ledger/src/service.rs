//! Ledger Service
//!
//! Orchestrates the domain over the storage port. Mutations on one account
//! are serialized through [`AccountLocks`] and applied inside a single
//! storage transaction; reads take no lock.

use crate::domain::{
    projections, transaction_number, Account, AccountLocks, LedgerError, ReceiptPayment,
    RecordDraft, StoreError, DEFAULT_PAYMENT_METHOD,
};
use crate::ports::{LedgerApi, LedgerStore, LedgerTransaction, SystemTimeSource, TimeSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{
    AccountId, AccountValidation, AccountsSummary, BalanceSummary, Money, PaidReceipt,
    PaymentResult, PendingReceipts, ReceiptHistory, ReceiptId, ReceiptStatistics, RechargeResult,
    TransactionHistory, TransactionId, TransactionKind,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Description stored on credit records when the caller gives none.
pub const DEFAULT_RECHARGE_DESCRIPTION: &str = "Recarga de saldo";

/// Transaction processor implementing [`LedgerApi`].
pub struct LedgerService<S: LedgerStore> {
    store: Arc<S>,
    clock: Arc<dyn TimeSource>,
    locks: AccountLocks,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemTimeSource))
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            clock,
            locks: AccountLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn load_account(&self, id: &AccountId) -> Result<Account, LedgerError> {
        self.store
            .account(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.clone()))
    }
}

/// Commit on success; on failure roll back and surface the original error.
async fn finish<T>(
    mut tx: Box<dyn LedgerTransaction>,
    staged: Result<T, StoreError>,
) -> Result<T, LedgerError> {
    match staged {
        Ok(value) => {
            if let Err(e) = tx.commit().await {
                error!(error = %e, "ledger commit failed");
                return Err(e.into());
            }
            Ok(value)
        }
        Err(e) => {
            error!(error = %e, "ledger write failed, rolling back");
            if let Err(rollback) = tx.rollback().await {
                error!(error = %rollback, "ledger rollback failed");
            }
            Err(e.into())
        }
    }
}

struct PaymentWrite<'a> {
    account: &'a AccountId,
    receipt: ReceiptId,
    amount: Money,
    balance_before: Money,
    balance_after: Money,
    payment: ReceiptPayment,
}

async fn stage_payment(
    tx: &mut dyn LedgerTransaction,
    write: PaymentWrite<'_>,
) -> Result<TransactionId, StoreError> {
    tx.set_balance(write.account, write.balance_after).await?;
    let id = tx
        .append_record(RecordDraft {
            account_id: write.account.clone(),
            kind: TransactionKind::Payment,
            amount: write.amount,
            balance_before: write.balance_before,
            balance_after: write.balance_after,
            timestamp: write.payment.paid_at,
            receipt_id: Some(write.receipt),
            description: format!("Pago de recibo {}", write.receipt),
        })
        .await?;
    tx.mark_paid(write.receipt, write.payment).await?;
    Ok(id)
}

async fn stage_credit(
    tx: &mut dyn LedgerTransaction,
    account: &AccountId,
    amount: Money,
    balance_before: Money,
    at: DateTime<Utc>,
    description: String,
) -> Result<TransactionId, StoreError> {
    let balance_after = balance_before + amount;
    tx.set_balance(account, balance_after).await?;
    tx.append_record(RecordDraft {
        account_id: account.clone(),
        kind: TransactionKind::Credit,
        amount,
        balance_before,
        balance_after,
        timestamp: at,
        receipt_id: None,
        description,
    })
    .await
}

#[async_trait]
impl<S: LedgerStore + 'static> LedgerApi for LedgerService<S> {
    async fn pending_receipts(&self, account: &AccountId) -> Result<PendingReceipts, LedgerError> {
        let acct = self.load_account(account).await?;
        let receipts = self.store.pending_receipts(account).await?;
        debug!(account = %account, count = receipts.len(), "pending receipts loaded");
        Ok(projections::pending_receipts(&acct, &receipts, self.clock.now()))
    }

    async fn process_payment(
        &self,
        receipt_id: ReceiptId,
        account_id: &AccountId,
        payment_method: Option<String>,
    ) -> Result<PaymentResult, LedgerError> {
        let method = payment_method
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

        let not_found = || LedgerError::ReceiptNotFound {
            receipt: receipt_id,
            account: account_id.clone(),
        };

        // Receipts only exist for stored accounts, so unknown ids never reach
        // the lock table. The receipt is read again under the lock.
        if self.store.receipt(receipt_id, account_id).await?.is_none() {
            return Err(not_found());
        }

        let _guard = self.locks.acquire(account_id).await;

        let receipt = self
            .store
            .receipt(receipt_id, account_id)
            .await?
            .ok_or_else(not_found)?;
        if receipt.is_paid() {
            warn!(receipt = %receipt_id, account = %account_id, "payment rejected: already paid");
            return Err(LedgerError::AlreadyPaid(receipt_id));
        }

        let account = self.load_account(account_id).await?;
        if !account.is_active() {
            warn!(account = %account_id, status = account.status.as_str(), "payment rejected: account not active");
            return Err(LedgerError::AccountInactive(account_id.clone()));
        }
        let balance_after = account.balance.checked_debit(receipt.amount).ok_or(
            LedgerError::InsufficientFunds {
                required: receipt.amount,
                available: account.balance,
            },
        )?;

        let paid_at = self.clock.now();
        let number = transaction_number(paid_at, receipt_id);
        let payment = ReceiptPayment {
            paid_at,
            method: method.clone(),
            transaction_number: number.clone(),
        };

        let mut tx = self.store.begin().await?;
        let staged = stage_payment(
            tx.as_mut(),
            PaymentWrite {
                account: account_id,
                receipt: receipt_id,
                amount: receipt.amount,
                balance_before: account.balance,
                balance_after,
                payment,
            },
        )
        .await;
        let transaction_id = finish(tx, staged).await?;

        info!(
            receipt = %receipt_id,
            account = %account_id,
            amount = %receipt.amount,
            new_balance = %balance_after,
            transaction = %number,
            "payment processed"
        );

        Ok(PaymentResult {
            id_recibo: receipt_id,
            numero_cuenta: account_id.clone(),
            id_transaccion: transaction_id,
            numero_transaccion: number,
            monto_pagado: receipt.amount,
            fecha_pago: paid_at,
            nuevo_saldo: balance_after,
            metodo_pago: method,
        })
    }

    async fn paid_receipt(
        &self,
        receipt_id: ReceiptId,
        account_id: &AccountId,
    ) -> Result<PaidReceipt, LedgerError> {
        let not_found = || LedgerError::ReceiptNotFound {
            receipt: receipt_id,
            account: account_id.clone(),
        };
        let receipt = self
            .store
            .receipt(receipt_id, account_id)
            .await?
            .ok_or_else(not_found)?;
        let account = self.load_account(account_id).await?;
        projections::paid_receipt(&account, &receipt).ok_or_else(not_found)
    }

    async fn balance(&self, account_id: &AccountId) -> Result<BalanceSummary, LedgerError> {
        let account = self.load_account(account_id).await?;
        let receipts = self.store.receipts(account_id).await?;
        Ok(projections::balance_summary(&account, &receipts))
    }

    async fn recharge(
        &self,
        account_id: &AccountId,
        amount: Money,
        description: Option<String>,
    ) -> Result<RechargeResult, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "recharge amount must be greater than zero".to_string(),
            ));
        }

        self.load_account(account_id).await?;

        let _guard = self.locks.acquire(account_id).await;

        let account = self.load_account(account_id).await?;
        if !account.is_active() {
            warn!(account = %account_id, "recharge rejected: account not active");
            return Err(LedgerError::AccountInactive(account_id.clone()));
        }

        let at = self.clock.now();
        let description = description.unwrap_or_else(|| DEFAULT_RECHARGE_DESCRIPTION.to_string());
        let mut tx = self.store.begin().await?;
        let staged = stage_credit(
            tx.as_mut(),
            account_id,
            amount,
            account.balance,
            at,
            description,
        )
        .await;
        let transaction_id = finish(tx, staged).await?;
        let new_balance = account.balance + amount;

        info!(account = %account_id, amount = %amount, new_balance = %new_balance, "account recharged");

        Ok(RechargeResult {
            numero_cuenta: account_id.clone(),
            id_transaccion: transaction_id,
            monto_recargado: amount,
            saldo_anterior: account.balance,
            nuevo_saldo: new_balance,
            fecha_recarga: at,
        })
    }

    async fn transaction_history(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<TransactionHistory, LedgerError> {
        let account = self.load_account(account_id).await?;
        let records = self.store.transactions(account_id, limit).await?;
        Ok(projections::transaction_history(&account, &records))
    }

    async fn receipt_history(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<ReceiptHistory, LedgerError> {
        let account = self.load_account(account_id).await?;
        let mut receipts = self.store.receipts(account_id).await?;
        let total = receipts.len();
        receipts.truncate(limit);
        Ok(projections::receipt_history(&account, &receipts, total))
    }

    async fn receipt_statistics(
        &self,
        account_id: &AccountId,
    ) -> Result<ReceiptStatistics, LedgerError> {
        let account = self.load_account(account_id).await?;
        let receipts = self.store.receipts(account_id).await?;
        Ok(projections::receipt_statistics(&account, &receipts))
    }

    async fn validate_account(
        &self,
        account_id: &AccountId,
    ) -> Result<AccountValidation, LedgerError> {
        let account = self.store.account(account_id).await?;
        Ok(projections::account_validation(account_id, account.as_ref()))
    }

    async fn accounts_summary(&self) -> Result<AccountsSummary, LedgerError> {
        let accounts = self.store.accounts().await?;
        debug!(count = accounts.len(), "accounts summary computed");
        Ok(projections::accounts_summary(&accounts))
    }
}
