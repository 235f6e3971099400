//! Muninn error types

/// Boxed error type produced by loader collaborators.
///
/// Loaders are caller-supplied and may fail with any error type; the
/// engine only needs to display and record the failure, never to match
/// on it.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Durable store errors
    #[error("cache store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Loader errors (surfaced by `cache`; `load` records them instead)
    #[error("loader failed: {0}")]
    Loader(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A flush cycle hit its render-pass cap with loads still pending.
    ///
    /// Almost always a loader that fails on every attempt, which the
    /// retry-after-acknowledgment policy would otherwise re-run forever.
    /// Raise the cap via [`MuninnBuilder::max_passes`](crate::MuninnBuilder::max_passes)
    /// if the page simply has a deep chain of dependent loads.
    #[error("flush did not converge after {passes} render passes")]
    FlushDiverged { passes: usize },
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
