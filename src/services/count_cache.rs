use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Short-lived cache for `COUNT(*)` results.
pub trait CountCache: Send + Sync {
    fn get(&self, key: &str) -> Option<i64>;
    fn set(&self, key: &str, value: i64, ttl: Duration);
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process cache with per-entry expiry. Expired entries are never
/// returned; [`TtlCountCache::purge_expired`] reclaims their memory.
#[derive(Debug, Clone, Default)]
pub struct TtlCountCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl TtlCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written entry.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CountCache for TtlCountCache {
    fn get(&self, key: &str) -> Option<i64> {
        let entries = self.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value)
    }

    fn set(&self, key: &str, value: i64, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.lock()
            .insert(key.to_string(), Entry { value, expires_at });
    }
}
