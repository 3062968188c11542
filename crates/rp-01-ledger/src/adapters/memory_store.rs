use crate::domain::{Account, Receipt, ReceiptPayment, RecordDraft, StoreError, TransactionRecord};
use crate::ports::{LedgerStore, LedgerTransaction};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{AccountId, Money, ReceiptId, TransactionId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point at which the next transaction operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    SetBalance,
    AppendRecord,
    MarkPaid,
    Commit,
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    receipts: BTreeMap<ReceiptId, Receipt>,
    records: Vec<TransactionRecord>,
}

#[derive(Debug)]
struct Shared {
    state: RwLock<LedgerState>,
    next_record_id: AtomicU64,
    fail_point: Mutex<Option<FailPoint>>,
}

impl Shared {
    /// Fires the armed failure once if it matches `point`.
    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut armed = self.fail_point.lock();
        if *armed == Some(point) {
            *armed = None;
            return Err(StoreError::Backend(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

/// In-memory implementation of [`LedgerStore`].
///
/// Transactions stage their writes locally and apply them under a single
/// write lock on commit, so readers observe either none or all of them.
#[derive(Debug, Clone)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(LedgerState::default()),
                next_record_id: AtomicU64::new(1),
                fail_point: Mutex::new(None),
            }),
        }
    }

    /// Insert or replace an account.
    pub fn insert_account(&self, account: Account) {
        let mut state = self.shared.state.write();
        state.accounts.insert(account.id.clone(), account);
    }

    /// Insert or replace a receipt. Its account must exist.
    pub fn insert_receipt(&self, receipt: Receipt) -> Result<(), StoreError> {
        let mut state = self.shared.state.write();
        if !state.accounts.contains_key(&receipt.account_id) {
            return Err(StoreError::MissingRow(format!(
                "account {}",
                receipt.account_id
            )));
        }
        state.receipts.insert(receipt.id, receipt);
        Ok(())
    }

    /// Arm a one-shot failure for the next transaction reaching `point`.
    pub fn inject_failure(&self, point: FailPoint) {
        *self.shared.fail_point.lock() = Some(point);
    }

    /// Number of committed log records across all accounts.
    pub fn record_count(&self) -> usize {
        self.shared.state.read().records.len()
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.shared.state.read().accounts.get(id).cloned())
    }

    async fn receipt(
        &self,
        id: ReceiptId,
        account: &AccountId,
    ) -> Result<Option<Receipt>, StoreError> {
        let state = self.shared.state.read();
        Ok(state
            .receipts
            .get(&id)
            .filter(|r| &r.account_id == account)
            .cloned())
    }

    async fn pending_receipts(&self, account: &AccountId) -> Result<Vec<Receipt>, StoreError> {
        let state = self.shared.state.read();
        let mut pending: Vec<Receipt> = state
            .receipts
            .values()
            .filter(|r| &r.account_id == account && !r.is_paid())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn receipts(&self, account: &AccountId) -> Result<Vec<Receipt>, StoreError> {
        let state = self.shared.state.read();
        let mut receipts: Vec<Receipt> = state
            .receipts
            .values()
            .filter(|r| &r.account_id == account)
            .cloned()
            .collect();
        receipts.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then(b.id.cmp(&a.id)));
        Ok(receipts)
    }

    async fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        let state = self.shared.state.read();
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn transactions(
        &self,
        account: &AccountId,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.shared.state.read();
        let mut records: Vec<TransactionRecord> = state
            .records
            .iter()
            .filter(|r| &r.account_id == account)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            shared: self.shared.clone(),
            staged: Vec::new(),
            open: true,
        }))
    }
}

#[derive(Debug)]
enum StagedWrite {
    Balance { account: AccountId, balance: Money },
    Record(TransactionRecord),
    Paid { receipt: ReceiptId, payment: ReceiptPayment },
}

struct InMemoryTransaction {
    shared: Arc<Shared>,
    staged: Vec<StagedWrite>,
    open: bool,
}

impl InMemoryTransaction {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }

    fn validate(state: &LedgerState, staged: &[StagedWrite]) -> Result<(), StoreError> {
        for write in staged {
            match write {
                StagedWrite::Balance { account, .. } => {
                    if !state.accounts.contains_key(account) {
                        return Err(StoreError::MissingRow(format!("account {account}")));
                    }
                }
                StagedWrite::Record(record) => {
                    if !state.accounts.contains_key(&record.account_id) {
                        return Err(StoreError::MissingRow(format!(
                            "account {}",
                            record.account_id
                        )));
                    }
                }
                StagedWrite::Paid { receipt, .. } => match state.receipts.get(receipt) {
                    None => return Err(StoreError::MissingRow(format!("receipt {receipt}"))),
                    Some(r) if r.is_paid() => {
                        return Err(StoreError::Conflict(format!("receipt {receipt} already paid")))
                    }
                    Some(_) => {}
                },
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn set_balance(
        &mut self,
        account: &AccountId,
        balance: Money,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.shared.trip(FailPoint::SetBalance)?;
        self.staged.push(StagedWrite::Balance {
            account: account.clone(),
            balance,
        });
        Ok(())
    }

    async fn append_record(&mut self, draft: RecordDraft) -> Result<TransactionId, StoreError> {
        self.ensure_open()?;
        self.shared.trip(FailPoint::AppendRecord)?;
        let id = TransactionId(self.shared.next_record_id.fetch_add(1, Ordering::Relaxed));
        self.staged
            .push(StagedWrite::Record(TransactionRecord::from_draft(id, draft)));
        Ok(id)
    }

    async fn mark_paid(
        &mut self,
        receipt: ReceiptId,
        payment: ReceiptPayment,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.shared.trip(FailPoint::MarkPaid)?;
        self.staged.push(StagedWrite::Paid { receipt, payment });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.open = false;
        self.shared.trip(FailPoint::Commit)?;

        let staged = std::mem::take(&mut self.staged);
        let mut state = self.shared.state.write();
        Self::validate(&state, &staged)?;

        for write in staged {
            match write {
                StagedWrite::Balance { account, balance } => {
                    if let Some(acct) = state.accounts.get_mut(&account) {
                        acct.balance = balance;
                    }
                }
                StagedWrite::Record(record) => state.records.push(record),
                StagedWrite::Paid { receipt, payment } => {
                    if let Some(r) = state.receipts.get_mut(&receipt) {
                        r.payment = Some(payment);
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.open = false;
        self.staged.clear();
        Ok(())
    }
}
