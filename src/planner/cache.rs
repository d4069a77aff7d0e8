use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

/// Generic expiring cache for short-lived derived artifacts (most notably
/// the stats snapshot). Expired entries are evicted lazily on read.
#[derive(Default)]
pub struct TtlCache {
    entries: HashMap<String, CacheEntry>,
}

impl TtlCache {
    pub fn new() -> Self {
        TtlCache::default()
    }

    pub fn set(&mut self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry
                .expires_at
                .is_some_and(|deadline| Instant::now() > deadline),
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stores_and_returns_values() {
        let mut cache = TtlCache::new();
        cache.set("edenData", json!([1, 2, 3]), None);
        assert_eq!(cache.get("edenData"), Some(json!([1, 2, 3])));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let mut cache = TtlCache::new();
        cache.set("short", json!("x"), Some(Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("short"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = TtlCache::new();
        cache.set("a", json!(1), None);
        cache.set("b", json!(2), None);
        cache.clear();
        assert!(cache.is_empty());
    }
}
