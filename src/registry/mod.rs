//! In-flight request registry — at-most-one loader execution per key.
//!
//! The registry tracks, per key, the asynchronous operation currently
//! executing and the most recent failure. Together they implement the
//! dedup guarantee: however many render passes re-request a key, its
//! loader runs at most once per "unacknowledged" state.
//!
//! Pending operations are stored as [`Shared`] settlement handles, so
//! the flush loop can wait on them (repeatedly, even) without consuming
//! the dedup slot — the slot is only released by the loader task itself
//! when it settles.
//!
//! Failure records have acknowledge-once semantics: a failure blocks a
//! restart until one subsequent `load` call for the key observes and
//! clears it, so the very next render pass gets a fresh attempt.
//!
//! Internal to the engine; exercised through
//! [`LoadEngine`](crate::LoadEngine).

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::{BoxFuture, Shared};
use tracing::error;

use crate::lock::lock;
use crate::telemetry;

/// A cloneable handle that resolves when a loader task settles, whether
/// it succeeded or failed.
pub(crate) type PendingOp = Shared<BoxFuture<'static, ()>>;

/// Per-key pending operations and last failures.
#[derive(Debug)]
pub(crate) struct InflightRegistry {
    pending: Mutex<HashMap<String, PendingOp>>,
    failures: Mutex<HashMap<String, String>>,
    /// Failures consumed since the flush loop last drained the count.
    /// A render pass that acknowledged a failure has made its key
    /// eligible again, so the flush loop owes that key one more pass.
    acknowledged: AtomicUsize,
    /// Operations started since the flush loop last drained the count.
    /// Convergence means a pass that *triggered* nothing — checking only
    /// what is still pending would let a loader that settles faster than
    /// the pass finishes slip through, converging on stale output.
    started: AtomicUsize,
}

impl InflightRegistry {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            acknowledged: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
        }
    }

    /// Start a new operation for `key` unless one is pending or an
    /// unacknowledged failure blocks it.
    ///
    /// `start` is invoked under the pending-map lock, making
    /// check-and-insert atomic: concurrent callers cannot both start a
    /// loader for the same key. `start` must not block or await.
    ///
    /// Returns `true` if the operation was started and recorded.
    pub(crate) fn start_if_idle<F>(&self, key: &str, start: F) -> bool
    where
        F: FnOnce() -> PendingOp,
    {
        if lock(&self.failures, "registry.start_if_idle").contains_key(key) {
            return false;
        }

        let mut pending = lock(&self.pending, "registry.start_if_idle");
        if pending.contains_key(key) {
            return false;
        }
        let op = start();
        pending.insert(key.to_string(), op);
        self.started.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Release the pending slot for a successfully settled operation.
    pub(crate) fn settle(&self, key: &str) {
        lock(&self.pending, "registry.settle").remove(key);
    }

    /// Record a failed operation: release the pending slot and remember
    /// the failure until it is acknowledged.
    ///
    /// This is the single point where a loader failure is logged, so it
    /// is logged exactly once no matter how many passes observe it.
    pub(crate) fn record_failure(&self, key: &str, message: impl Into<String>) {
        let message = message.into();
        error!(key, error = %message, "loader failed");
        metrics::counter!(telemetry::LOADER_FAILURES_TOTAL).increment(1);

        lock(&self.failures, "registry.record_failure").insert(key.to_string(), message);
        lock(&self.pending, "registry.record_failure").remove(key);
    }

    /// Consume the recorded failure for `key`, if any.
    ///
    /// After this, the key is eligible for a fresh start.
    pub(crate) fn acknowledge_failure(&self, key: &str) -> Option<String> {
        let removed = lock(&self.failures, "registry.acknowledge_failure").remove(key);
        if removed.is_some() {
            self.acknowledged.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Whether any failures were acknowledged since the last drain.
    ///
    /// Resets the count; the flush loop calls this once per render pass
    /// to decide whether acknowledged keys are owed a retry pass.
    pub(crate) fn drain_acknowledged(&self) -> bool {
        self.acknowledged.swap(0, Ordering::Relaxed) > 0
    }

    /// Whether any operations were started since the last drain.
    ///
    /// Resets the count; the flush loop calls this once per render pass.
    /// A pass that started work is never the converged pass, even when
    /// every started operation has already settled by the time the pass
    /// is inspected.
    pub(crate) fn drain_started(&self) -> bool {
        self.started.swap(0, Ordering::Relaxed) > 0
    }

    /// Whether any key has an unsettled operation.
    pub(crate) fn has_pending(&self) -> bool {
        !lock(&self.pending, "registry.has_pending").is_empty()
    }

    /// Snapshot of all unsettled operations' settlement handles.
    ///
    /// Cloning [`Shared`] handles leaves the dedup slots in place;
    /// awaiting the snapshot waits for settlement without racing the
    /// tasks' own slot release.
    pub(crate) fn pending_operations(&self) -> Vec<PendingOp> {
        lock(&self.pending, "registry.pending_operations")
            .values()
            .cloned()
            .collect()
    }
}
