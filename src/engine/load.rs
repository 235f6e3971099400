//! LoadEngine — the two cache access primitives, `load` and `cache`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde_json::Value;

use crate::registry::InflightRegistry;
use crate::store::CacheStore;
use crate::types::LoadOptions;
use crate::{LoaderError, MuninnError, Result, telemetry};

/// Data-loading cache and convergence engine.
///
/// Owns one [`CacheStore`] and one in-flight request registry; built via
/// [`Muninn::builder()`](crate::Muninn::builder). Rendering code requests
/// data through [`load`](LoadEngine::load) (synchronous call sites) or
/// [`cache`](LoadEngine::cache) (awaiting call sites), and
/// [`flush`](LoadEngine::flush) re-renders until everything requested
/// has resolved.
#[derive(Debug)]
pub struct LoadEngine {
    store: Arc<CacheStore>,
    registry: Arc<InflightRegistry>,
    max_passes: usize,
}

impl LoadEngine {
    pub(crate) fn new(store: CacheStore, max_passes: usize) -> Self {
        Self {
            store: Arc::new(store),
            registry: Arc::new(InflightRegistry::new()),
            max_passes,
        }
    }

    pub(crate) fn registry(&self) -> &InflightRegistry {
        &self.registry
    }

    pub(crate) fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// The engine's durable cache store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Request data from a synchronous call site.
    ///
    /// Returns the live cached value if one exists. Otherwise — unless
    /// an operation for the key is already in flight or an
    /// unacknowledged failure blocks it — the loader is started in the
    /// background and `None` is returned for this render pass; a later
    /// pass (driven by [`flush`](LoadEngine::flush)) finds the value
    /// cached.
    ///
    /// However many passes re-request a key, its loader executes at
    /// most once per unacknowledged state. A loader failure (error or
    /// panic) never crosses this boundary: it is logged, recorded for
    /// the key, and cleared by the next `load` call so the following
    /// pass retries.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (the loader is spawned
    /// onto the ambient runtime). Inside `flush` this always holds.
    pub fn load<F, Fut>(&self, loader: F, options: LoadOptions) -> Option<Value>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<Value, LoaderError>> + Send + 'static,
    {
        let LoadOptions { key, duration } = options;
        let cached = self.store.get(&key);

        if cached.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "api" => "load").increment(1);
            self.registry.acknowledge_failure(&key);
            return cached;
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "api" => "load").increment(1);

        // Consume any previously recorded failure first: it is reported
        // to exactly this call, and the operation started below must not
        // have its own (possibly instant) failure eaten by the same call.
        let blocked = self.registry.acknowledge_failure(&key).is_some();
        if !blocked {
            let store = Arc::clone(&self.store);
            let registry = Arc::clone(&self.registry);
            let task_key = key.clone();
            let started = self.registry.start_if_idle(&key, || {
                tokio::spawn(run_loader(loader, task_key, duration, store, registry))
                    .map(|_| ())
                    .boxed()
                    .shared()
            });
            if started {
                metrics::counter!(telemetry::LOADERS_STARTED_TOTAL).increment(1);
            }
        }

        cached
    }

    /// Request data from an awaiting call site.
    ///
    /// A live cached value resolves immediately without invoking the
    /// loader; otherwise the loader is awaited in place, its result
    /// stored with the options' duration, and returned. Loader and
    /// store-write failures propagate to the caller.
    ///
    /// Unlike [`load`](LoadEngine::load) there is no dedup registry —
    /// the caller controls sequencing, so two overlapping `cache` calls
    /// for one key may both execute their loader.
    pub async fn cache<F, Fut>(&self, loader: F, options: LoadOptions) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Value, LoaderError>>,
    {
        if let Some(value) = self.store.get(&options.key) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "api" => "cache").increment(1);
            return Ok(value);
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "api" => "cache").increment(1);

        let value = loader()
            .await
            .map_err(|e| MuninnError::Loader(e.to_string()))?;
        self.store.set(&options.key, value.clone(), options.duration)?;
        Ok(value)
    }

    /// Seed the cache directly, without a loader.
    ///
    /// The next `load` or `cache` for the key is a hit.
    pub fn prime(&self, key: &str, value: Value, duration: Option<Duration>) -> Result<()> {
        self.store.set(key, value, duration)
    }

    /// Drop all in-memory-only (immortal) cache entries.
    pub fn clear_all_memory(&self) {
        self.store.clear_all_memory();
    }

    /// Reset the engine's cache: empty memory and delete the backing
    /// file.
    pub fn cleanup(&self) {
        self.store.cleanup();
    }

    /// Snapshot of all live cached values.
    pub fn dump(&self) -> std::collections::HashMap<String, Value> {
        self.store.dump()
    }
}

/// Background task driving one loader to settlement.
///
/// Runs under `catch_unwind` so a panicking loader (the synchronous
/// throw case) settles the same way as a rejecting one. Every path
/// releases the registry slot.
async fn run_loader<F, Fut>(
    loader: F,
    key: String,
    duration: Option<Duration>,
    store: Arc<CacheStore>,
    registry: Arc<InflightRegistry>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = std::result::Result<Value, LoaderError>> + Send + 'static,
{
    let outcome = AssertUnwindSafe(async move { loader().await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => match store.set(&key, value, duration) {
            Ok(()) => registry.settle(&key),
            // No caller to return the write failure to from inside the
            // task; record it as the key's failure so it is logged and
            // retried like any other.
            Err(e) => registry.record_failure(&key, e.to_string()),
        },
        Ok(Err(e)) => registry.record_failure(&key, e.to_string()),
        Err(panic) => registry.record_failure(&key, panic_message(panic)),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("loader panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("loader panicked: {message}")
    } else {
        "loader panicked".to_string()
    }
}
