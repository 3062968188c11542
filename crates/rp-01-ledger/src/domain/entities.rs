//! Ledger entities: accounts, receipts and the append-only transaction log.

use chrono::{DateTime, Utc};
use shared_types::{
    AccountId, AccountStatus, Money, ReceiptId, ReceiptStatus, TransactionId, TransactionKind,
};

/// Payment method recorded when the caller does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Saldo en cuenta";

/// A customer account holding a spendable balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub holder_name: String,
    pub balance: Money,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// New active account.
    pub fn new(
        id: AccountId,
        holder_name: impl Into<String>,
        balance: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            holder_name: holder_name.into(),
            balance,
            status: AccountStatus::Active,
            created_at,
        }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Settlement details stamped on a receipt when it is paid.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptPayment {
    pub paid_at: DateTime<Utc>,
    pub method: String,
    pub transaction_number: String,
}

/// A bill owed by an account.
///
/// The status is derived from `payment`, so a receipt is `Paid` exactly when
/// it carries settlement details.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub id: ReceiptId,
    pub account_id: AccountId,
    pub amount: Money,
    pub issued_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub concept: String,
    pub billing_period: String,
    pub consumption_kwh: f64,
    pub payment: Option<ReceiptPayment>,
}

impl Receipt {
    /// New pending receipt with empty billing metadata.
    pub fn pending(
        id: ReceiptId,
        account_id: AccountId,
        amount: Money,
        issued_at: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            amount,
            issued_at,
            due_date,
            concept: String::new(),
            billing_period: String::new(),
            consumption_kwh: 0.0,
            payment: None,
        }
    }

    pub fn with_billing(
        mut self,
        concept: impl Into<String>,
        billing_period: impl Into<String>,
        consumption_kwh: f64,
    ) -> Self {
        self.concept = concept.into();
        self.billing_period = billing_period.into();
        self.consumption_kwh = consumption_kwh;
        self
    }

    pub fn status(&self) -> ReceiptStatus {
        if self.payment.is_some() {
            ReceiptStatus::Paid
        } else {
            ReceiptStatus::Pending
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment.is_some()
    }
}

/// A ledger record before storage assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
    pub timestamp: DateTime<Utc>,
    pub receipt_id: Option<ReceiptId>,
    pub description: String,
}

/// One immutable entry of the transaction log.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
    pub timestamp: DateTime<Utc>,
    pub receipt_id: Option<ReceiptId>,
    pub description: String,
}

impl TransactionRecord {
    pub fn from_draft(id: TransactionId, draft: RecordDraft) -> Self {
        Self {
            id,
            account_id: draft.account_id,
            kind: draft.kind,
            amount: draft.amount,
            balance_before: draft.balance_before,
            balance_after: draft.balance_after,
            timestamp: draft.timestamp,
            receipt_id: draft.receipt_id,
            description: draft.description,
        }
    }
}

/// Human-readable payment reference: `TXN-<millis>-<receiptId>`.
pub fn transaction_number(at: DateTime<Utc>, receipt: ReceiptId) -> String {
    format!("TXN-{}-{}", at.timestamp_millis(), receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_receipt_status_follows_payment() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut receipt = Receipt::pending(
            ReceiptId::new(789).unwrap(),
            AccountId::parse("ABC").unwrap(),
            Money::from_cents(12000),
            now,
            now,
        );
        assert_eq!(receipt.status(), ReceiptStatus::Pending);

        receipt.payment = Some(ReceiptPayment {
            paid_at: now,
            method: DEFAULT_PAYMENT_METHOD.to_string(),
            transaction_number: transaction_number(now, receipt.id),
        });
        assert_eq!(receipt.status(), ReceiptStatus::Paid);
    }

    #[test]
    fn test_transaction_number_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let number = transaction_number(at, ReceiptId::new(42).unwrap());
        assert_eq!(number, "TXN-1700000000123-42");
    }
}
