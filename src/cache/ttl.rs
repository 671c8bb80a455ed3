//! Self-expiring key/value store with sliding expiration.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
    /// Identifies the `store` call that created the entry, so a timer
    /// scheduled by an older store never removes a newer value.
    generation: u64,
}

/// A concurrent map whose entries remove themselves after a TTL.
///
/// `store` schedules removal, `load` pushes the deadline back by a full TTL,
/// `delete` removes immediately. Cloning shares the underlying map.
pub struct TtlCache<K, V> {
    inner: Arc<DashMap<K, Entry<V>>>,
    ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ttl: self.ttl,
            generation: self.generation.clone(),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or replace `key`, scheduling its removal after the TTL.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn store(&self, key: K, value: V) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let expires_at = Instant::now() + self.ttl;
        self.inner.insert(
            key.clone(),
            Entry {
                value,
                expires_at,
                generation,
            },
        );

        let map = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut deadline = expires_at;
            loop {
                tokio::time::sleep_until(deadline).await;
                let Some(map) = map.upgrade() else { return };

                let current = match map.get(&key) {
                    Some(entry) if entry.generation == generation => entry.expires_at,
                    _ => return,
                };
                if current > Instant::now() {
                    // Extended by a load in the meantime.
                    deadline = current;
                    continue;
                }
                map.remove_if(&key, |_, entry| {
                    entry.generation == generation && entry.expires_at <= Instant::now()
                });
                return;
            }
        });
    }

    /// Return the value for `key` and extend its lifetime by a full TTL.
    pub fn load(&self, key: &K) -> Option<V> {
        let mut entry = self.inner.get_mut(key)?;
        entry.expires_at = Instant::now() + self.ttl;
        Some(entry.value.clone())
    }

    /// Return the value for `key` without touching its deadline.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value.clone())
    }

    /// Remove `key`, cancelling its scheduled expiry.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|(_, entry)| entry.value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const TTL: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_load_extends_lifetime() {
        let cache = TtlCache::new(TTL);
        cache.store("a", 1);

        sleep(Duration::from_millis(70)).await;
        assert_eq!(cache.load(&"a"), Some(1));

        // Past the original deadline, but only 70ms after the load.
        sleep(Duration::from_millis(70)).await;
        assert_eq!(cache.peek(&"a"), Some(1));
    }

    #[tokio::test]
    async fn test_unloaded_key_expires() {
        let cache = TtlCache::new(TTL);
        cache.store("a", 1);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.load(&"a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_store_twice_keeps_latest() {
        let cache = TtlCache::new(TTL);
        cache.store("a", 1);
        sleep(Duration::from_millis(60)).await;
        cache.store("a", 2);

        // The first store's timer fires here and must not remove the second value.
        sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.peek(&"a"), Some(2));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.peek(&"a"), None);
    }

    #[tokio::test]
    async fn test_delete_then_store() {
        let cache = TtlCache::new(TTL);
        cache.store("a", 1);
        assert_eq!(cache.delete(&"a"), Some(1));
        assert_eq!(cache.load(&"a"), None);

        cache.store("a", 3);
        assert_eq!(cache.load(&"a"), Some(3));
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache: TtlCache<u32, bool> = TtlCache::new(Duration::from_secs(5));
        let mut handles = Vec::new();
        for i in 0..8u32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..50u32 {
                    let key = i * 100 + j;
                    cache.store(key, true);
                    assert_eq!(cache.load(&key), Some(true));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
