//! Keyed storage for live sessions.
//!
//! Each entry sits behind its own async mutex, so requests against one session
//! run one at a time while different sessions proceed in parallel. The map's
//! shard lock is only held long enough to clone the entry's `Arc`.
//!
//! Players rarely close their sessions, so entries record when they were last
//! handed out and idle ones are evicted.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

struct Entry<V> {
    value: Arc<Mutex<V>>,
    /// Milliseconds after the store's epoch.
    touched: AtomicU64,
}

pub struct SessionStore<K, V>
where
    K: Eq + Hash,
{
    sessions: DashMap<K, Entry<V>>,
    epoch: Instant,
}

impl<K, V> SessionStore<K, V>
where
    K: Eq + Hash + Copy,
{
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            epoch: Instant::now(),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Arc<Mutex<V>> {
        let value = Arc::new(Mutex::new(value));
        let entry = Entry {
            value: value.clone(),
            touched: AtomicU64::new(self.millis(Instant::now())),
        };
        self.sessions.insert(key, entry);
        value
    }

    pub fn get(&self, key: &K) -> Option<Arc<Mutex<V>>> {
        self.sessions.get(key).map(|entry| {
            entry
                .touched
                .store(self.millis(Instant::now()), Ordering::Relaxed);
            entry.value.clone()
        })
    }

    /// Drops the session. Holders of its handle keep it alive until they
    /// release it.
    pub fn remove(&self, key: &K) -> bool {
        self.sessions.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops sessions nobody has touched for `max_idle`. Returns how many.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_at(Instant::now(), max_idle)
    }

    /// Sessions whose handle is out (a request is using them) are kept.
    fn evict_idle_at(&self, now: Instant, max_idle: Duration) -> usize {
        let cutoff = self
            .millis(now)
            .saturating_sub(u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX));
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            entry.touched.load(Ordering::Relaxed) >= cutoff
                || Arc::strong_count(&entry.value) > 1
        });
        before.saturating_sub(self.sessions.len())
    }

    fn millis(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.epoch).as_millis()).unwrap_or(u64::MAX)
    }
}

impl<K, V> Default for SessionStore<K, V>
where
    K: Eq + Hash + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_are_shared_until_removed() {
        let store: SessionStore<u32, Vec<&str>> = SessionStore::new();
        store.insert(1, Vec::new());

        let handle = store.get(&1).unwrap();
        handle.lock().await.push("first");
        assert_eq!(store.get(&1).unwrap().lock().await.len(), 1);

        assert!(store.remove(&1));
        assert!(store.get(&1).is_none());
        assert!(!store.remove(&1));
        // Outstanding handles still see the value
        assert_eq!(handle.lock().await[0], "first");
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let store: SessionStore<u32, ()> = SessionStore::new();
        store.insert(1, ());
        store.insert(2, ());
        let later = Instant::now() + Duration::from_secs(600);

        assert_eq!(store.evict_idle_at(later, Duration::from_secs(900)), 0);
        assert_eq!(store.len(), 2);

        // A session in use survives however old it is
        let in_use = store.get(&2).unwrap();
        assert_eq!(store.evict_idle_at(later, Duration::from_secs(60)), 1);
        assert!(store.get(&1).is_none());
        assert!(store.get(&2).is_some());

        drop(in_use);
        assert_eq!(store.evict_idle(Duration::from_secs(60)), 0);
        assert_eq!(store.evict_idle_at(later, Duration::from_secs(60)), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn tracks_size() {
        let store: SessionStore<u32, ()> = SessionStore::default();
        assert!(store.is_empty());
        store.insert(1, ());
        store.insert(2, ());
        assert_eq!(store.len(), 2);
    }
}
