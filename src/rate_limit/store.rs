use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::rate_limit::{Decision, Quota, TokenBucket};

/// Per-key limiter state.
#[derive(Debug)]
pub(crate) struct Entry {
    bucket: TokenBucket,
    last_seen: Duration,
}

/// Outcome of a single store access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Access {
    pub(crate) decision: Decision,
    /// `true` if this access created the entry.
    pub(crate) created: bool,
}

/// In-memory key → bucket map guarded by a single lock.
///
/// Every operation takes the lock exactly once and never holds it across an
/// await point, so lookup, creation and consumption for a key are one
/// linearizable step.
#[derive(Debug, Default)]
pub(crate) struct EntryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl EntryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Buckets are only touched through non-panicking O(1) updates, so a
    // poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get or create the entry for `key`, refresh `last_seen`, and take one permit.
    ///
    /// `quota` is only consulted when the entry has to be created.
    pub(crate) fn acquire(&self, key: &str, now: Duration, quota: impl FnOnce() -> Quota) -> Access {
        let mut guard = self.lock();

        if let Some(entry) = guard.get_mut(key) {
            entry.last_seen = entry.last_seen.max(now);
            return Access { decision: entry.bucket.acquire(now), created: false };
        }

        let mut bucket = TokenBucket::new(quota(), now);
        let decision = bucket.acquire(now);
        guard.insert(key.to_owned(), Entry { bucket, last_seen: now });
        Access { decision, created: true }
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drop every entry idle for strictly longer than `idle_timeout`.
    ///
    /// Returns `(evicted, remaining)`.
    pub(crate) fn evict_idle(&self, now: Duration, idle_timeout: Duration) -> (usize, usize) {
        let mut guard = self.lock();
        let before = guard.len();
        guard.retain(|_, entry| now.saturating_sub(entry.last_seen) <= idle_timeout);
        (before - guard.len(), guard.len())
    }
}
