//! Named lock registry.
//!
//! Some resources mutate a field of a remote object they do not own, e.g. the
//! allowed-client list of an OIDC key. Two such resources touching the same
//! key must not interleave their read-modify-write cycles, so each cycle holds
//! the lock named after the remote path for its whole duration.

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

lazy_static! {
    static ref GLOBAL: Arc<MutexRegistry> = Arc::new(MutexRegistry::new());
}

/// Map of lock name to lock. Entries are created on first use and never removed.
#[derive(Debug, Default)]
pub struct MutexRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry shared by every provider instance.
    pub fn global() -> Arc<MutexRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Wait for the lock named `key`. It is released when the guard drops.
    pub async fn lock(&self, key: &str) -> PathLockGuard {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        tracing::debug!(key = %key, "waiting for lock");
        let guard = mutex.lock_owned().await;
        tracing::debug!(key = %key, "lock acquired");

        PathLockGuard { key: key.to_string(), _guard: guard }
    }

    /// Number of distinct names seen so far
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held lock on one name.
#[derive(Debug)]
pub struct PathLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl PathLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        tracing::debug!(key = %self.key, "lock released");
    }
}
