//! Per-key async locks.
//!
//! Used to serialise work that shares an idempotency key or a player without
//! introducing any global lock. Each key maps to a weakly held
//! `tokio::sync::Mutex`; entries whose lock is no longer held by anyone are
//! swept out as the map grows.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Sweep dead entries once the map grows past this many keys.
const MIN_SWEEP_THRESHOLD: usize = 64;

struct LockMap<K> {
    locks: HashMap<K, Weak<AsyncMutex<()>>>,
    sweep_at: usize,
}

/// A family of async mutexes addressed by key.
pub struct KeyedLocks<K> {
    inner: Mutex<LockMap<K>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LockMap {
                locks: HashMap::new(),
                sweep_at: MIN_SWEEP_THRESHOLD,
            }),
        }
    }

    /// Acquire the lock for `key`, waiting if another task holds it.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let mutex = self.mutex_for(key);
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked (live or not yet swept).
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .locks
            .len()
    }

    fn mutex_for(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.locks.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        let mutex = Arc::new(AsyncMutex::new(()));
        map.locks.insert(key.clone(), Arc::downgrade(&mutex));

        if map.locks.len() >= map.sweep_at {
            map.locks.retain(|_, weak| weak.strong_count() > 0);
            map.sweep_at = (map.locks.len() * 2).max(MIN_SWEEP_THRESHOLD);
        }
        mutex
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
