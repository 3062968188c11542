//! Due-date arithmetic for the receipt read models.

use chrono::{DateTime, Utc};

/// A receipt due within this many days (inclusive) is urgent.
pub const URGENT_WINDOW_DAYS: i64 = 5;

/// Maximum number of receipts listed as most urgent.
pub const MOST_URGENT_LIMIT: usize = 3;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days until `due`, rounded up. Negative once overdue.
pub fn days_until_due(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ceil_days((due - now).num_milliseconds())
}

/// Urgent means due in `0..=URGENT_WINDOW_DAYS` days.
pub fn is_urgent(due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (0..=URGENT_WINDOW_DAYS).contains(&days_until_due(due, now))
}

/// Whole days a payment came after the due date, rounded up; 0 if on time.
pub fn days_paid_late(due: DateTime<Utc>, paid_at: DateTime<Utc>) -> i64 {
    if paid_at <= due {
        0
    } else {
        ceil_days((paid_at - due).num_milliseconds())
    }
}

fn ceil_days(millis: i64) -> i64 {
    -((-millis).div_euclid(MILLIS_PER_DAY))
}
