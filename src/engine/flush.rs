//! Flush convergence loop — re-render until all requested data resolves.

use futures_util::future::join_all;
use tracing::debug;

use crate::types::Flushed;
use crate::{MuninnError, Result, telemetry};

use super::LoadEngine;

impl LoadEngine {
    /// Render to a fixed point.
    ///
    /// Invokes `render` and, while the pass left loads in flight, waits
    /// for **all** of them to settle — success or failure alike, so one
    /// failing loader neither blocks the rest nor aborts the cycle —
    /// then renders again. Each pass finds more keys cached (or more
    /// failures acknowledged), so the cycle converges unless a loader
    /// fails on every attempt; the pass cap turns that into
    /// [`MuninnError::FlushDiverged`] rather than an endless build.
    ///
    /// A pass that acknowledged a loader failure gets one follow-up
    /// pass even when nothing is pending — acknowledgment made the key
    /// eligible again, and the cycle owes it the retry.
    ///
    /// Returns the final pass's output together with a dump of all
    /// cached values, for hydration or debugging.
    ///
    /// `render` runs once per pass and must be safe to call repeatedly;
    /// apart from its `load`/`cache` calls it should be idempotent.
    /// Chained dependencies (a key only requested once another key's
    /// value is visible) cost one extra pass per link.
    ///
    /// No timeout is imposed on loaders: a hung loader stalls the cycle
    /// indefinitely. Callers needing bounded build times should wrap
    /// the loader future itself (e.g. `tokio::time::timeout`).
    pub async fn flush<T>(&self, mut render: impl FnMut() -> T) -> Result<Flushed<T>> {
        let mut passes = 0usize;
        loop {
            passes += 1;
            let content = render();

            // Converged only if the pass triggered nothing: no loaders
            // started (a fast loader may settle before we look, so the
            // pending map alone is not enough), no failures acknowledged
            // (those keys are owed their retry), nothing still pending.
            let started = self.registry().drain_started();
            let acknowledged = self.registry().drain_acknowledged();
            if !started && !acknowledged && !self.registry().has_pending() {
                debug!(passes, "flush converged");
                metrics::histogram!(telemetry::FLUSH_PASSES).record(passes as f64);
                metrics::counter!(telemetry::FLUSH_CYCLES_TOTAL, "outcome" => "ok").increment(1);
                return Ok(Flushed {
                    content,
                    data: self.store().dump(),
                });
            }

            if passes >= self.max_passes() {
                metrics::counter!(telemetry::FLUSH_CYCLES_TOTAL, "outcome" => "diverged")
                    .increment(1);
                return Err(MuninnError::FlushDiverged { passes });
            }

            let pending = self.registry().pending_operations();
            debug!(
                passes,
                started,
                acknowledged,
                pending = pending.len(),
                "render pass triggered work; waiting before the next pass"
            );
            join_all(pending).await;
        }
    }
}
