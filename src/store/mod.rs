//! Durable cache store — disk-backed key/value storage with per-entry TTL.
//!
//! [`CacheStore`] owns an in-memory map initialised from a JSON backing
//! file at open time and shared by both access APIs. The backing file is
//! a single JSON object mapping `key -> [value, expirationEpochMillisOrNull]`
//! and is rewritten in full on every durable mutation.
//!
//! # Persistence policy
//!
//! Only entries with a TTL are written through to disk. Immortal entries
//! (no duration) are in-process memoization and live in memory until
//! [`CacheStore::clear_all_memory`] drops them. This trades durability
//! for write volume: a TTL'd entry survives a crash before the next
//! graceful flush, an immortal one is recomputed on the next build.
//!
//! # Error conditions
//!
//! A missing or unreadable backing file reads as an empty cache and is
//! (re)created — a warm cache is never worth failing a build over. A
//! failed *write* is returned to the caller of [`set`](CacheStore::set)
//! / [`clear`](CacheStore::clear): silently losing a persisted entry
//! would surface later as a stale-data bug.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::lock::lock;
use crate::{MuninnError, Result};

/// One cache slot: the stored value and its optional expiration.
///
/// Serialized as the two-element array `[value, expiration]` so the
/// backing file stays a plain JSON object of key → pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry(Value, Option<u64>);

impl CacheEntry {
    fn new(value: Value, expires_at: Option<u64>) -> Self {
        Self(value, expires_at)
    }

    /// The stored value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Expiration as Unix epoch milliseconds, `None` for immortal entries.
    pub fn expires_at(&self) -> Option<u64> {
        self.1
    }

    fn is_expired(&self, now_ms: u64) -> bool {
        matches!(self.1, Some(expiration) if now_ms > expiration)
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        // A clock before 1970 reads as 0; TTLs degrade to "not yet expired"
        .unwrap_or_default()
        .as_millis() as u64
}

// ============================================================================
// Backing file I/O
// ============================================================================

/// Read the backing file.
///
/// Returns `None` on a missing, unreadable, or corrupt file (logs a
/// warning on the latter two) — the caller starts empty and recreates it.
fn read_backing_file(path: &Path) -> Option<HashMap<String, CacheEntry>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read cache backing file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt cache backing file");
            None
        }
    }
}

/// Rewrite the backing file in full (atomic write via tmp + rename).
fn write_backing_file(path: &Path, entries: &HashMap<String, CacheEntry>) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            MuninnError::Store(format!(
                "failed to create cache dir {}: {e}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string(entries)?;
    std::fs::write(&tmp_path, &json).map_err(|e| {
        MuninnError::Store(format!(
            "failed to write cache file {}: {e}",
            tmp_path.display()
        ))
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        MuninnError::Store(format!(
            "failed to rename cache file {} → {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    Ok(())
}

// ============================================================================
// CacheStore
// ============================================================================

/// Disk-backed key/value store with per-entry lazy expiration.
///
/// Created once per engine instance and shared by the `load` and `cache`
/// APIs. All methods take `&self`; mutations are serialized behind one
/// mutex, which also makes the backing file single-writer within a
/// process. Concurrent processes sharing one backing file are out of
/// scope.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    /// Open a store backed by the given file.
    ///
    /// A missing or unreadable file is treated as an empty cache and the
    /// file is (re)created. Failure to create it is returned as an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match read_backing_file(&path) {
            Some(entries) => entries,
            None => {
                let empty = HashMap::new();
                write_backing_file(&path, &empty)?;
                empty
            }
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the live value for a key.
    ///
    /// An entry past its expiration is evicted, the eviction persisted,
    /// and `None` returned (lazy expiration — there is no background
    /// sweep).
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = lock(&self.entries, "store.get");

        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired(now_millis()),
            None => return None,
        };

        if expired {
            entries.remove(key);
            // Expired entries always carried a TTL, so the slot exists on
            // disk and the eviction must be made durable too.
            if let Err(e) = write_backing_file(&self.path, &entries) {
                error!(key, error = %e, "failed to persist expired-entry eviction");
            }
            return None;
        }

        entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store a value, with expiration `now + duration` when a duration
    /// is given.
    ///
    /// Writes through to the backing file only when an expiration is set
    /// (see the module docs for the persistence policy).
    pub fn set(
        &self,
        key: &str,
        value: Value,
        duration: Option<std::time::Duration>,
    ) -> Result<()> {
        let expires_at = duration.map(|d| now_millis() + d.as_millis() as u64);
        let mut entries = lock(&self.entries, "store.set");
        entries.insert(key.to_string(), CacheEntry::new(value, expires_at));

        if expires_at.is_some() {
            write_backing_file(&self.path, &entries)?;
        }
        Ok(())
    }

    /// Remove one entry from memory and durable storage.
    pub fn clear(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries, "store.clear");
        entries.remove(key);
        write_backing_file(&self.path, &entries)
    }

    /// Drop every entry that has no expiration.
    ///
    /// Immortal entries exist only as in-process memoization, so this
    /// touches neither TTL'd entries nor the backing file.
    pub fn clear_all_memory(&self) {
        lock(&self.entries, "store.clear_all_memory")
            .retain(|_, entry| entry.expires_at().is_some());
    }

    /// Reset the store: empty the in-memory map and delete the backing
    /// file.
    ///
    /// A failed deletion is ignored — the file may never have been
    /// created.
    pub fn cleanup(&self) {
        lock(&self.entries, "store.cleanup").clear();
        let _ = std::fs::remove_file(&self.path);
    }

    /// Snapshot of all live values (values only, no expirations).
    ///
    /// Entries past their TTL are skipped but not evicted; eviction
    /// stays lazy in [`get`](CacheStore::get).
    pub fn dump(&self) -> HashMap<String, Value> {
        let now = now_millis();
        lock(&self.entries, "store.dump")
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.value().clone()))
            .collect()
    }

    /// Number of entries currently held in memory.
    pub fn len(&self) -> usize {
        lock(&self.entries, "store.len").len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
