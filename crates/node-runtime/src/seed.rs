//! # Demo Data
//!
//! Accounts and receipts loaded at startup so the gateway can be exercised
//! without a database.
//!
//! | Account | Balance | Pending receipts |
//! |---------|---------|------------------|
//! | `ABC` | 500.00 | 789 (120.00, due in 3 days), 101 (85.50), 102 (240.00) |
//! | `XYZ` | 50.00 | 200 (100.00) |
//! | `EMPTY` | 1000.00 | none |

use chrono::{DateTime, Duration, Utc};
use rp_01_ledger::{Account, InMemoryLedgerStore, Receipt, StoreError};
use rust_decimal::Decimal;
use shared_types::{AccountId, Money, ReceiptId};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid seed identifier: {0}")]
    InvalidId(String),
    #[error("failed to store seed data: {0}")]
    Store(#[from] StoreError),
}

/// What was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub accounts: usize,
    pub receipts: usize,
}

struct AccountSeed {
    id: &'static str,
    holder: &'static str,
    balance_cents: i64,
    created_days_ago: i64,
}

struct ReceiptSeed {
    id: i64,
    account: &'static str,
    amount_cents: i64,
    due_in_days: i64,
    period: &'static str,
    consumption_kwh: f64,
}

const ACCOUNTS: &[AccountSeed] = &[
    AccountSeed {
        id: "ABC",
        holder: "Ana Beltrán Castro",
        balance_cents: 50_000,
        created_days_ago: 400,
    },
    AccountSeed {
        id: "XYZ",
        holder: "Ximena Yáñez Zapata",
        balance_cents: 5_000,
        created_days_ago: 120,
    },
    AccountSeed {
        id: "EMPTY",
        holder: "Eduardo Montes",
        balance_cents: 100_000,
        created_days_ago: 30,
    },
];

const RECEIPTS: &[ReceiptSeed] = &[
    ReceiptSeed {
        id: 789,
        account: "ABC",
        amount_cents: 12_000,
        due_in_days: 3,
        period: "Enero 2025",
        consumption_kwh: 245.5,
    },
    ReceiptSeed {
        id: 101,
        account: "ABC",
        amount_cents: 8_550,
        due_in_days: 12,
        period: "Febrero 2025",
        consumption_kwh: 178.0,
    },
    ReceiptSeed {
        id: 102,
        account: "ABC",
        amount_cents: 24_000,
        due_in_days: 40,
        period: "Marzo 2025",
        consumption_kwh: 410.25,
    },
    ReceiptSeed {
        id: 200,
        account: "XYZ",
        amount_cents: 10_000,
        due_in_days: 1,
        period: "Enero 2025",
        consumption_kwh: 205.0,
    },
];

const CONCEPT: &str = "Consumo de energía eléctrica";
const BILLING_CYCLE_DAYS: i64 = 30;

fn account_id(raw: &str) -> Result<AccountId, SeedError> {
    AccountId::parse(raw).ok_or_else(|| SeedError::InvalidId(raw.to_string()))
}

fn money(cents: i64) -> Money {
    Money::new(Decimal::new(cents, 2))
}

/// Load the demo data into `store`, with dates relative to `now`.
pub fn seed_demo_data(
    store: &InMemoryLedgerStore,
    now: DateTime<Utc>,
) -> Result<SeedSummary, SeedError> {
    for seed in ACCOUNTS {
        store.insert_account(Account::new(
            account_id(seed.id)?,
            seed.holder,
            money(seed.balance_cents),
            now - Duration::days(seed.created_days_ago),
        ));
    }

    for seed in RECEIPTS {
        let id = ReceiptId::new(seed.id).ok_or_else(|| SeedError::InvalidId(seed.id.to_string()))?;
        let due_date = now + Duration::days(seed.due_in_days);
        store.insert_receipt(
            Receipt::pending(
                id,
                account_id(seed.account)?,
                money(seed.amount_cents),
                due_date - Duration::days(BILLING_CYCLE_DAYS),
                due_date,
            )
            .with_billing(CONCEPT, seed.period, seed.consumption_kwh),
        )?;
    }

    let summary = SeedSummary {
        accounts: ACCOUNTS.len(),
        receipts: RECEIPTS.len(),
    };
    info!(
        accounts = summary.accounts,
        receipts = summary.receipts,
        "Loaded demo data"
    );
    Ok(summary)
}
