use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A small time-bounded memo map for expensive backend answers such as
/// folder sizes. Expiry is checked lazily on access; nothing runs in the
/// background.
pub struct TtlCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(entry) = self.entries.get(key)
            && entry.expires_at <= Instant::now()
        {
            self.entries.remove(key);
        }
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the cached value or runs `fetch`, caching its success. A
    /// failed fetch caches nothing, so the next call retries.
    pub fn get_or_fetch<E>(
        &mut self,
        key: K,
        fetch: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E>
    where
        K: Clone,
        V: Clone,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value.clone());
        }
        let value = fetch()?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
