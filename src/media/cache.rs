use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Seven days, how long live-set search results are reused
pub const LIVE_SET_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Shared in-memory cache with a fixed time-to-live.
///
/// Keys are compared case-insensitively. Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value, unless it has expired. An expired entry is removed.
    pub async fn get(&self, key: &str) -> Option<V> {
        let key = Self::normalize(key);
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                None => return None,
                Some(entry) if Instant::now() < entry.expires_at => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Another writer may have refreshed it in between
        if entries
            .get(&key)
            .is_some_and(|entry| Instant::now() >= entry.expires_at)
        {
            entries.remove(&key);
        }
        None
    }

    pub async fn insert(&self, key: &str, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(Self::normalize(key), entry);
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
