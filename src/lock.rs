//! Poison-recovering lock acquisition.
//!
//! A panic inside a loader task must not wedge the whole engine, so
//! every mutex acquisition recovers from poisoning instead of
//! propagating the panic.

use std::sync::{Mutex, MutexGuard};

use tracing::warn;

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(op, "recovered from poisoned engine lock");
            poisoned.into_inner()
        }
    }
}
