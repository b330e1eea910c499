//! Short-lived response cache
//!
//! A key-based store with a fixed time-to-live. Staleness is evaluated lazily
//! on lookup; there is no background sweep, so memory is bounded only by the
//! (small, fixed) key space of tracked regions and counties.
//!
//! Two callers that both observe a miss will both go upstream. There is no
//! single-flight de-duplication.

use crate::clock::{Clock, system_clock};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Cached value with the instant it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Stale once `now - fetched_at >= ttl`
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age >= ttl,
            Err(_) => false,
        }
    }
}

/// TTL cache shared between concurrent callers
pub struct ResponseCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, or `None` when absent or stale
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let guard = self.entries.read().ok()?;
        guard
            .get(key)
            .filter(|entry| !entry.is_stale(now, self.ttl))
            .map(|entry| entry.data.clone())
    }

    /// Store `value`, replacing any previous entry wholesale
    pub fn put(&self, key: &str, value: T) {
        let entry = CacheEntry {
            data: value,
            fetched_at: self.clock.now(),
        };
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(key.to_string(), entry);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.write() {
            guard.clear();
        }
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn put_replaces_entry() {
        let clock = clock();
        let cache = ResponseCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        cache.put("k", 1u32);
        cache.put("k", 2u32);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stale_exactly_at_ttl() {
        let clock = clock();
        let cache = ResponseCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        cache.put("k", "v".to_string());
        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(cache.get("k"), None);
        // Stale entries are not swept, only bypassed
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let cache: ResponseCache<u8> = ResponseCache::new(Duration::from_secs(5));
        cache.put("a", 1);
        cache.put("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}
