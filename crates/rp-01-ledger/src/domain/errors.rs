//! Ledger error types.

use shared_types::{AccountId, ErrorKind, Money, ReceiptId};
use thiserror::Error;

/// Failures reported by a storage adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A staged write targets a row that does not exist.
    #[error("missing row: {0}")]
    MissingRow(String),

    /// A staged write conflicts with the committed state.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// Transaction already committed or rolled back.
    #[error("transaction is closed")]
    Closed,

    /// Backend unavailable or failed.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Errors surfaced by the transaction processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Input rejected before any storage access.
    #[error("{0}")]
    Validation(String),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("receipt {receipt} not found for account {account}")]
    ReceiptNotFound {
        receipt: ReceiptId,
        account: AccountId,
    },

    #[error("receipt {0} is already paid")]
    AlreadyPaid(ReceiptId),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Money, available: Money },

    #[error("account {0} is not active")]
    AccountInactive(AccountId),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Wire error kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::AccountNotFound(_) | Self::ReceiptNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyPaid(_) => ErrorKind::AlreadyPaid,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::AccountInactive(_) => ErrorKind::AccountInactive,
            Self::Storage(_) => ErrorKind::OperationError,
        }
    }
}
