//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units or plain counts.
//!
//! # Common labels
//!
//! - `api` — access path: "load" or "cache"
//! - `outcome` — settlement outcome: "ok" or "error"

/// Total cache hits across both access APIs.
///
/// Labels: `api` ("load" | "cache").
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total cache misses across both access APIs.
///
/// Labels: `api` ("load" | "cache").
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total loader executions started by `load`.
///
/// Deduplicated calls (a pending operation already exists for the key)
/// do not count; this tracks actual spawned work.
pub const LOADERS_STARTED_TOTAL: &str = "muninn_loaders_started_total";

/// Total loader failures recorded by the in-flight registry.
///
/// One increment per settled failure (rejection or panic), regardless
/// of how many render passes later observe it.
pub const LOADER_FAILURES_TOTAL: &str = "muninn_loader_failures_total";

/// Total completed flush cycles.
///
/// Labels: `outcome` ("ok" | "diverged").
pub const FLUSH_CYCLES_TOTAL: &str = "muninn_flush_cycles_total";

/// Render passes needed per flush cycle.
///
/// Histogram; a converged cycle records its final pass count.
pub const FLUSH_PASSES: &str = "muninn_flush_passes";
