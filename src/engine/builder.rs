//! Builder for configuring engine instances

use std::path::PathBuf;

use crate::store::CacheStore;
use crate::{MuninnError, Result};

use super::LoadEngine;

/// Default cache name; the backing file becomes `.muninn-load-cache`.
pub const DEFAULT_CACHE_NAME: &str = "muninn-load-cache";

/// Default maximum render passes per flush cycle.
const DEFAULT_MAX_PASSES: usize = 64;

/// Main entry point for creating engine instances.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> MuninnBuilder {
        MuninnBuilder::new()
    }
}

/// Builder for configuring engine instances.
///
/// Each built [`LoadEngine`] owns its own cache store and in-flight
/// registry — one per build/serve process, or one per test, with no
/// shared process-wide state.
///
/// ```rust,no_run
/// # use muninn::Muninn;
/// # fn main() -> muninn::Result<()> {
/// let engine = Muninn::builder()
///     .cache_name("site-cache")
///     .cache_dir("/tmp/my-site")
///     .max_passes(16)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct MuninnBuilder {
    cache_name: String,
    cache_dir: Option<PathBuf>,
    max_passes: usize,
}

impl MuninnBuilder {
    pub fn new() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            cache_dir: None,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Name the cache instance. The backing file is `.{name}` in the
    /// cache directory.
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Set the directory holding the backing file (default: the process
    /// working directory).
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Cap the number of render passes per flush cycle (default: 64).
    ///
    /// When a cycle hits the cap with loads still pending, `flush`
    /// returns [`MuninnError::FlushDiverged`] instead of looping — an
    /// always-failing loader would otherwise be retried forever.
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes;
        self
    }

    /// Build the engine, opening (or creating) the backing file.
    pub fn build(self) -> Result<LoadEngine> {
        if self.cache_name.is_empty() {
            return Err(MuninnError::Configuration(
                "cache_name must not be empty".to_string(),
            ));
        }
        if self.max_passes == 0 {
            return Err(MuninnError::Configuration(
                "max_passes must be at least 1".to_string(),
            ));
        }

        let dir = match self.cache_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|e| {
                MuninnError::Configuration(format!("failed to resolve working directory: {e}"))
            })?,
        };
        let store = CacheStore::open(dir.join(format!(".{}", self.cache_name)))?;

        Ok(LoadEngine::new(store, self.max_passes))
    }
}

impl Default for MuninnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Muninn::builder().cache_dir(dir.path()).build().unwrap();
        assert!(
            engine
                .store()
                .path()
                .ends_with(format!(".{DEFAULT_CACHE_NAME}"))
        );
    }

    #[test]
    fn cache_name_becomes_dotfile() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Muninn::builder()
            .cache_name("my-site")
            .cache_dir(dir.path())
            .build()
            .unwrap();
        assert_eq!(engine.store().path(), dir.path().join(".my-site"));
        assert!(engine.store().path().exists());
    }

    #[test]
    fn empty_cache_name_rejected() {
        let err = Muninn::builder().cache_name("").build().unwrap_err();
        assert!(err.to_string().contains("cache_name"));
    }

    #[test]
    fn zero_max_passes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Muninn::builder()
            .cache_dir(dir.path())
            .max_passes(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_passes"));
    }
}
