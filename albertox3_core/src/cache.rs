use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A concurrent map whose entries expire after a fixed time to live.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value unless it expired, expired entries are dropped on access.
    pub fn get(&self, key: &K) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.1 > Instant::now() => return Some(entry.0.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries
                .remove_if(key, |_, (_, expires)| *expires <= Instant::now());
        }

        None
    }

    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let expires = now.checked_add(self.ttl).unwrap_or(now);
        self.entries.insert(key, (value, expires));
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, (value, _))| value)
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, (_, expires)| *expires > now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_fresh_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("settings::money:start", "100".to_string());

        assert_eq!(cache.get(&"settings::money:start").as_deref(), Some("100"));
        assert_eq!(cache.get(&"settings::unknown"), None);
    }

    #[test]
    fn expired_entries_are_never_returned() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert(1_u64, true);

        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn overwrite_and_remove() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert(7_u64, false);
        cache.insert(7_u64, true);

        assert_eq!(cache.get(&7), Some(true));
        assert_eq!(cache.remove(&7), Some(true));
        assert_eq!(cache.get(&7), None);
    }

    #[test]
    fn purge_drops_only_expired() {
        let fresh = TtlCache::new(Duration::from_secs(60));
        fresh.insert(1_u64, 1);
        fresh.purge_expired();
        assert_eq!(fresh.len(), 1);

        let stale = TtlCache::new(Duration::ZERO);
        stale.insert(1_u64, 1);
        stale.insert(2_u64, 2);
        stale.purge_expired();
        assert!(stale.is_empty());
    }
}
