//! Public option and result types for the load engine.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

/// Options for a single [`load`](crate::LoadEngine::load),
/// [`cache`](crate::LoadEngine::cache), or
/// [`prime`](crate::LoadEngine::prime) call.
///
/// The key is caller-chosen and unique within one engine instance — no
/// implied namespacing. The optional duration is a time-to-live; without
/// one, the entry is memoized for the process lifetime and never written
/// to disk (see [`CacheStore`](crate::store::CacheStore) for the
/// persistence policy).
///
/// ```rust
/// # use muninn::LoadOptions;
/// # use std::time::Duration;
/// let opts = LoadOptions::new("/posts").duration(Duration::from_secs(60));
/// assert_eq!(opts.key, "/posts");
/// ```
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Cache key identifying this unit of data.
    pub key: String,
    /// Time-to-live. `None` means no expiration.
    pub duration: Option<Duration>,
}

impl LoadOptions {
    /// Create options for the given key, with no expiration.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            duration: None,
        }
    }

    /// Set a time-to-live for the cached value.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Result of a converged flush cycle.
///
/// `content` is the return value of the final render pass — the one that
/// triggered no new loads. `data` is a snapshot of every live cached
/// value, keyed as the loads were keyed, for client-side hydration or
/// debugging.
#[derive(Debug)]
pub struct Flushed<T> {
    /// Output of the final render pass.
    pub content: T,
    /// All live cached values at convergence time.
    pub data: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_no_expiration() {
        let opts = LoadOptions::new("key");
        assert_eq!(opts.key, "key");
        assert!(opts.duration.is_none());
    }

    #[test]
    fn options_duration_setter() {
        let opts = LoadOptions::new("key").duration(Duration::from_millis(250));
        assert_eq!(opts.duration, Some(Duration::from_millis(250)));
    }
}
