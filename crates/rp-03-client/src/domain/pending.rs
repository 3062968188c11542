//! Pending call store.
//!
//! Maps correlation ids to waiting callers. Every completion path (reply,
//! timeout, stale discard) must first remove the entry, so whichever path
//! removes it is the only one that completes the call.

use super::error::ClientError;
use super::reply::Reply;
use dashmap::DashMap;
use shared_types::{Action, Request};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome delivered to a waiting caller.
pub type CallResult = Result<Reply, ClientError>;

/// A call waiting for its reply
struct PendingCall {
    sender: oneshot::Sender<CallResult>,
    /// Kept for resend after reconnect
    request: Request,
    enqueued_at: Instant,
}

/// Statistics for the pending call store
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    pub total_stale: AtomicU64,
    /// Replies whose id matched no pending call
    pub total_unmatched: AtomicU64,
}

/// Calls split on reconnect.
#[derive(Debug, Default)]
pub struct ResendPlan {
    /// Still pending, to be sent again
    pub resend: Vec<(u64, Request)>,
    /// Failed with `Stale` and removed
    pub discarded: usize,
}

#[derive(Default)]
pub struct PendingCalls {
    pending: DashMap<u64, PendingCall>,
    stats: PendingStats,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call and get the receiver its outcome is delivered on.
    pub fn register(&self, id: u64, request: Request) -> oneshot::Receiver<CallResult> {
        let (tx, rx) = oneshot::channel();
        let action = request.action();
        self.pending.insert(
            id,
            PendingCall {
                sender: tx,
                request,
                enqueued_at: Instant::now(),
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = id, action = %action, "registered pending call");
        rx
    }

    /// Complete a call with its reply. Returns false for unknown ids, which
    /// covers replies arriving after a timeout.
    pub fn complete(&self, id: u64, result: CallResult) -> bool {
        let Some((_, call)) = self.pending.remove(&id) else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(request_id = id, "reply for unknown or expired request dropped");
            return false;
        };

        debug!(
            request_id = id,
            action = %call.request.action(),
            elapsed_ms = call.enqueued_at.elapsed().as_millis() as u64,
            "completed pending call"
        );
        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        // The caller may have gone away; the entry is gone either way.
        let _ = call.sender.send(result);
        true
    }

    /// Remove a call whose timer fired. Returns false if another path got
    /// there first.
    pub fn expire(&self, id: u64) -> bool {
        match self.pending.remove(&id) {
            Some((_, call)) => {
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    request_id = id,
                    action = %call.request.action(),
                    "pending call timed out"
                );
                true
            }
            None => false,
        }
    }

    /// Drop a call that was never sent.
    pub fn cancel(&self, id: u64) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Split pending calls for a fresh connection: calls older than
    /// `stale_after` are removed and failed with `Stale`, the rest stay
    /// pending and are returned for resend, oldest first.
    pub fn plan_resend(&self, stale_after: Duration) -> ResendPlan {
        let now = Instant::now();
        let stale: Vec<u64> = self
            .pending
            .iter()
            .filter(|entry| now.duration_since(entry.enqueued_at) > stale_after)
            .map(|entry| *entry.key())
            .collect();

        let mut plan = ResendPlan::default();
        for id in stale {
            if let Some((_, call)) = self.pending.remove(&id) {
                let action = call.request.action();
                warn!(request_id = id, action = %action, "discarding stale pending call");
                self.stats.total_stale.fetch_add(1, Ordering::Relaxed);
                let _ = call.sender.send(Err(ClientError::Stale {
                    request_id: id,
                    action,
                }));
                plan.discarded += 1;
            }
        }

        let mut fresh: Vec<(Instant, u64, Request)> = self
            .pending
            .iter()
            .map(|entry| (entry.enqueued_at, *entry.key(), entry.request.clone()))
            .collect();
        fresh.sort_by_key(|(enqueued_at, id, _)| (*enqueued_at, *id));
        plan.resend = fresh
            .into_iter()
            .map(|(_, id, request)| (id, request))
            .collect();
        plan
    }

    pub fn action_of(&self, id: u64) -> Option<Action> {
        self.pending.get(&id).map(|call| call.request.action())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
