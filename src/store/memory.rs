use crate::core::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheValue<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

/// In-memory cache with per-entry TTL. Expired entries are dropped when read
/// or on the next write.
pub struct MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, CacheValue<V>>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Stored entries, expired ones included until a read or write drops them.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

fn purge_expired<K, V>(cache: &mut HashMap<K, CacheValue<V>>, now: Instant) -> usize {
    let before = cache.len();
    cache.retain(|_, entry| entry.is_live(now));
    before - cache.len()
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        let live = cache.get(key).map(|entry| entry.is_live(Instant::now()));
        match live {
            Some(true) => {
                debug!("Cache HIT for key: {:?}", key);
                cache.get(key).map(|entry| entry.value.clone())
            }
            Some(false) => {
                debug!("Cache entry expired for key: {:?}", key);
                cache.remove(key);
                None
            }
            None => {
                debug!("Cache MISS for key: {:?}", key);
                None
            }
        }
    }

    /// Stores `value` and drops every other entry that has expired.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        let expires_at = ttl.map(|duration| now + duration);
        let cache_value = CacheValue { value, expires_at };

        let mut cache = self.inner.lock().await;
        let purged = purge_expired(&mut cache, now);
        if purged > 0 {
            debug!(purged, "Cache PURGE");
        }
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, cache_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_cache_get_put() {
        let cache = MemoryCache::<String, i32>::new();

        assert!(cache.get(&"latest:EUR".to_string()).await.is_none());

        cache.put("latest:EUR".to_string(), 123, None).await;

        assert_eq!(cache.get(&"latest:EUR".to_string()).await, Some(123));
        assert!(cache.get(&"latest:USD".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped_on_read() {
        let cache = MemoryCache::<String, i32>::new();

        cache
            .put("latest:EUR".to_string(), 123, Some(Duration::from_millis(10)))
            .await;
        assert_eq!(cache.get(&"latest:EUR".to_string()).await, Some(123));

        sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&"latest:EUR".to_string()).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_put_sweeps_expired_entries() {
        let cache = MemoryCache::<String, i32>::new();

        cache
            .put("short".to_string(), 1, Some(Duration::from_millis(10)))
            .await;
        cache
            .put("long".to_string(), 2, Some(Duration::from_secs(60)))
            .await;
        cache.put("forever".to_string(), 3, None).await;
        assert_eq!(cache.len().await, 3);

        sleep(Duration::from_millis(20)).await;
        cache.put("fresh".to_string(), 4, None).await;

        assert_eq!(cache.len().await, 3);
        assert!(cache.get(&"short".to_string()).await.is_none());
        assert_eq!(cache.get(&"long".to_string()).await, Some(2));
        assert_eq!(cache.get(&"forever".to_string()).await, Some(3));
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_key() {
        let cache = MemoryCache::<String, i32>::new();

        cache.put("latest:EUR".to_string(), 1, None).await;
        cache.put("latest:EUR".to_string(), 2, None).await;

        assert_eq!(cache.get(&"latest:EUR".to_string()).await, Some(2));
        assert_eq!(cache.len().await, 1);
    }
}
