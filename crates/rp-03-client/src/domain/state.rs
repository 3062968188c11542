//! Connection state machine and reconnect backoff.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// ```text
/// Disconnected ──connect──> Connecting ──open──> Connected
///      ^                      │  ^                  │
///      │ disconnect()         │  └── unexpected ────┘
///      │                      │      close
///      └──────────────────────┤
///                             └── max_retries failures ──> GaveUp
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal until the next explicit `connect()`.
    GaveUp,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::GaveUp => "gave_up",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    /// Consecutive failed attempts since the last successful open.
    pub reconnect_attempts: u32,
    pub pending_calls: usize,
}

/// Delay before the next attempt after `failures` consecutive failed
/// attempts: `min(base * 2^failures, cap)`.
pub fn backoff_delay(base: Duration, cap: Duration, failures: u32) -> Duration {
    let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(cap).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_backoff_sequence() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);
        let delays: Vec<u64> = (0..7)
            .map(|n| backoff_delay(base, cap, n).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_backoff_saturates() {
        let cap = Duration::from_secs(30);
        assert_eq!(backoff_delay(Duration::from_secs(1), cap, 40), cap);
        assert_eq!(backoff_delay(Duration::from_secs(u64::MAX / 2), cap, 3), cap);
    }

    proptest! {
        #[test]
        fn prop_backoff_matches_formula(base_ms in 1u64..5_000, cap_ms in 1u64..120_000, n in 0u32..20) {
            let base = Duration::from_millis(base_ms);
            let cap = Duration::from_millis(cap_ms);
            let expected = Duration::from_millis((base_ms << n).min(cap_ms));
            prop_assert_eq!(backoff_delay(base, cap, n), expected);
        }

        #[test]
        fn prop_backoff_never_exceeds_cap(base_ms in 1u64..u64::MAX / 4, n in 0u32..64) {
            let cap = Duration::from_secs(30);
            prop_assert!(backoff_delay(Duration::from_millis(base_ms), cap, n) <= cap);
        }
    }
}
