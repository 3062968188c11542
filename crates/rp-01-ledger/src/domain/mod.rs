//! Domain layer of the transaction processor.

pub mod due_dates;
pub mod entities;
pub mod errors;
pub mod locks;
pub mod projections;

pub use due_dates::{days_until_due, is_urgent, MOST_URGENT_LIMIT, URGENT_WINDOW_DAYS};
pub use entities::{
    transaction_number, Account, Receipt, ReceiptPayment, RecordDraft, TransactionRecord,
    DEFAULT_PAYMENT_METHOD,
};
pub use errors::{LedgerError, StoreError};
pub use locks::AccountLocks;
