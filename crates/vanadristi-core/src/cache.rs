//! Query cache shared by every query and mutation.
//!
//! The cache stores one type-erased value per [`QueryKey`] together with the
//! time it was fetched. An entry is *fresh* while it is younger than
//! [`CacheConfig::stale_time`] and has not been invalidated. Reads of a stale
//! entry miss, which makes the next fetch go to the server.
//!
//! Invalidation comes in two forms:
//!
//! - [`QueryCache::invalidate`] marks exactly one key
//! - [`QueryCache::invalidate_prefix`] marks every key starting with the
//!   given segments, so invalidating `["plants"]` also marks
//!   `["plants", "latest"]`
//!
//! Each invalidation is broadcast as a [`CacheEvent`] so that observers can
//! refetch the queries they render.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vanadristi_core::cache::{QueryCache, QueryKey};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = QueryCache::default();
//! cache.insert(QueryKey::new(["plants"]), Arc::new(vec!["Fern".to_string()])).await;
//!
//! let hit = cache.get::<Vec<String>>(&QueryKey::new(["plants"])).await;
//! assert_eq!(hit.unwrap().len(), 1);
//!
//! cache.invalidate_prefix(&QueryKey::new(["plants"])).await;
//! assert!(cache.get::<Vec<String>>(&QueryKey::new(["plants"])).await.is_none());
//! # }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::time::Instant;
use tracing::debug;

/// Composite cache key: resource name followed by its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Build a key from its segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// The key's segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns true if `prefix` matches the leading segments of this key.
    ///
    /// Every key starts with itself and with the empty key.
    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}", segment)?;
        }
        f.write_str("]")
    }
}

/// Build a [`QueryKey`] from anything that implements `ToString`.
///
/// ```
/// use vanadristi_core::query_key;
///
/// let id = "p1";
/// let key = query_key!["sensor", "latest", id];
/// assert_eq!(key.segments().len(), 3);
/// ```
#[macro_export]
macro_rules! query_key {
    ($($segment:expr),* $(,)?) => {
        $crate::cache::QueryKey::new([$(::std::string::ToString::to_string(&$segment)),*])
    };
}

/// Cache timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched value is served without going back to the server.
    #[serde(with = "duration_secs")]
    pub stale_time: Duration,
    /// How long an entry may go unread before garbage collection evicts it.
    #[serde(with = "duration_secs")]
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            gc_time: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Never serve cached values; every read goes to the server.
    pub fn always_stale() -> Self {
        Self {
            stale_time: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Set the stale time.
    #[must_use]
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Set the garbage collection time.
    #[must_use]
    pub fn gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Events emitted by the cache.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum CacheEvent {
    /// A value was fetched from the server and stored.
    Fetched { key: QueryKey },
    /// A fetch failed; nothing was stored.
    FetchFailed { key: QueryKey, error: String },
    /// Entries matching `key` were marked stale. With `exact == false` the key
    /// is a prefix.
    Invalidated { key: QueryKey, exact: bool },
    /// An unused entry was dropped by garbage collection.
    Evicted { key: QueryKey },
}

impl CacheEvent {
    /// Returns true if this event invalidates `key`.
    #[must_use]
    pub fn invalidates(&self, key: &QueryKey) -> bool {
        match self {
            Self::Invalidated { key: pattern, exact } => {
                if *exact {
                    key == pattern
                } else {
                    key.starts_with(pattern)
                }
            }
            _ => false,
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    last_access: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.fetched_at.elapsed() < stale_time
    }
}

struct Inner {
    config: CacheConfig,
    entries: RwLock<HashMap<QueryKey, Entry>>,
    fetch_locks: Mutex<HashMap<QueryKey, Arc<Mutex<()>>>>,
    events: broadcast::Sender<CacheEvent>,
}

/// Shared, cloneable query cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("receivers", &self.inner.events.receiver_count())
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl QueryCache {
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                config,
                entries: RwLock::new(HashMap::new()),
                fetch_locks: Mutex::new(HashMap::new()),
                events,
            }),
        }
    }

    /// The cache's timing configuration.
    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    /// Subscribe to cache events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        // Ignore error if no receivers
        let _ = self.inner.events.send(event);
    }

    /// Get a fresh value of type `T`.
    ///
    /// Returns `None` on a miss, on a stale or invalidated entry, and when
    /// the stored value has a different type.
    pub async fn get<T: Any + Send + Sync>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let stale_time = self.inner.config.stale_time;
        let mut entries = self.inner.entries.write().await;
        let entry = entries.get_mut(key)?;
        entry.last_access = Instant::now();
        if !entry.is_fresh(stale_time) {
            return None;
        }
        Arc::clone(&entry.value).downcast::<T>().ok()
    }

    /// Get the stored value of type `T` whether or not it is fresh.
    pub async fn peek<T: Any + Send + Sync>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entries = self.inner.entries.read().await;
        let entry = entries.get(key)?;
        Arc::clone(&entry.value).downcast::<T>().ok()
    }

    /// Returns true if `key` holds a fresh entry.
    pub async fn is_fresh(&self, key: &QueryKey) -> bool {
        let entries = self.inner.entries.read().await;
        entries
            .get(key)
            .is_some_and(|e| e.is_fresh(self.inner.config.stale_time))
    }

    /// When the stored value was fetched, fresh or not.
    pub async fn fetched_at(&self, key: &QueryKey) -> Option<Instant> {
        self.inner.entries.read().await.get(key).map(|e| e.fetched_at)
    }

    /// Store a freshly fetched value.
    pub async fn insert<T: Any + Send + Sync>(&self, key: QueryKey, value: Arc<T>) {
        let now = Instant::now();
        let mut entries = self.inner.entries.write().await;
        entries.insert(
            key,
            Entry {
                value,
                fetched_at: now,
                last_access: now,
                invalidated: false,
            },
        );
    }

    /// Mark exactly `key` as stale. Returns the number of entries marked.
    pub async fn invalidate(&self, key: &QueryKey) -> usize {
        let marked = {
            let mut entries = self.inner.entries.write().await;
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.invalidated = true;
                    1
                }
                None => 0,
            }
        };
        debug!("Invalidated {} ({} entries)", key, marked);
        self.emit(CacheEvent::Invalidated {
            key: key.clone(),
            exact: true,
        });
        marked
    }

    /// Mark every key starting with `prefix` as stale. Returns the number of
    /// entries marked.
    pub async fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let marked = {
            let mut entries = self.inner.entries.write().await;
            entries
                .iter_mut()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(_, entry)| entry.invalidated = true)
                .count()
        };
        debug!("Invalidated prefix {} ({} entries)", prefix, marked);
        self.emit(CacheEvent::Invalidated {
            key: prefix.clone(),
            exact: false,
        });
        marked
    }

    /// Remove an entry entirely.
    pub async fn remove(&self, key: &QueryKey) -> bool {
        self.inner.entries.write().await.remove(key).is_some()
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        self.inner.entries.write().await.clear();
    }

    /// Number of stored entries (fresh or not).
    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.entries.read().await.is_empty()
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.inner.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Evict entries that were not read within [`CacheConfig::gc_time`].
    ///
    /// Returns the number of evicted entries.
    pub async fn collect_garbage(&self) -> usize {
        let gc_time = self.inner.config.gc_time;
        let evicted: Vec<QueryKey> = {
            let mut entries = self.inner.entries.write().await;
            let expired: Vec<QueryKey> = entries
                .iter()
                .filter(|(_, e)| e.last_access.elapsed() >= gc_time)
                .map(|(k, _)| k.clone())
                .collect();
            for key in &expired {
                entries.remove(key);
            }
            expired
        };

        {
            let entries = self.inner.entries.read().await;
            let mut locks = self.inner.fetch_locks.lock().await;
            locks.retain(|key, lock| entries.contains_key(key) || Arc::strong_count(lock) > 1);
        }

        for key in &evicted {
            debug!("Evicted {}", key);
            self.emit(CacheEvent::Evicted { key: key.clone() });
        }
        evicted.len()
    }

    /// Lock serializing fetches of one key.
    ///
    /// Holding this lock while fetching guarantees at most one in-flight
    /// request per key; later callers re-check the cache after acquiring it.
    pub async fn fetch_lock(&self, key: &QueryKey) -> Arc<Mutex<()>> {
        let mut locks = self.inner.fetch_locks.lock().await;
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(segments: &[&str]) -> QueryKey {
        QueryKey::new(segments.iter().copied())
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key(&["plants", "latest"]).to_string(), r#"["plants", "latest"]"#);
        assert_eq!(query_key!["plant", 7].to_string(), r#"["plant", "7"]"#);
    }

    #[test]
    fn test_key_prefix() {
        assert!(key(&["plants", "latest"]).starts_with(&key(&["plants"])));
        assert!(!key(&["plant", "p1"]).starts_with(&key(&["plants"])));
        assert!(!key(&["plants"]).starts_with(&key(&["plants", "latest"])));
    }

    #[test]
    fn test_cache_config_serde_in_seconds() {
        let config = CacheConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"stale_time":30,"gc_time":300}"#);
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = QueryCache::default();
        cache.insert(key(&["plants"]), Arc::new(3_u32)).await;

        assert_eq!(*cache.get::<u32>(&key(&["plants"])).await.unwrap(), 3);
        assert!(cache.get::<String>(&key(&["plants"])).await.is_none());
        assert!(cache.get::<u32>(&key(&["other"])).await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale() {
        let cache = QueryCache::new(CacheConfig::default().stale_time(Duration::from_secs(10)));
        cache.insert(key(&["plants"]), Arc::new(1_u8)).await;
        assert!(cache.is_fresh(&key(&["plants"])).await);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!cache.is_fresh(&key(&["plants"])).await);
        assert!(cache.get::<u8>(&key(&["plants"])).await.is_none());
        // Stale data is still available for display while refetching.
        assert!(cache.peek::<u8>(&key(&["plants"])).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_exact_leaves_children() {
        let cache = QueryCache::default();
        cache.insert(key(&["plants"]), Arc::new(1_u8)).await;
        cache.insert(key(&["plants", "latest"]), Arc::new(2_u8)).await;

        assert_eq!(cache.invalidate(&key(&["plants"])).await, 1);
        assert!(!cache.is_fresh(&key(&["plants"])).await);
        assert!(cache.is_fresh(&key(&["plants", "latest"])).await);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_marks_children() {
        let cache = QueryCache::default();
        cache.insert(key(&["plants"]), Arc::new(1_u8)).await;
        cache.insert(key(&["plants", "latest"]), Arc::new(2_u8)).await;
        cache.insert(key(&["plant", "p1"]), Arc::new(3_u8)).await;

        assert_eq!(cache.invalidate_prefix(&key(&["plants"])).await, 2);
        assert!(cache.is_fresh(&key(&["plant", "p1"])).await);
    }

    #[tokio::test]
    async fn test_reinsert_clears_invalidation() {
        let cache = QueryCache::default();
        cache.insert(key(&["a"]), Arc::new(1_u8)).await;
        cache.invalidate(&key(&["a"])).await;
        cache.insert(key(&["a"]), Arc::new(2_u8)).await;
        assert_eq!(*cache.get::<u8>(&key(&["a"])).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalidation_events() {
        let cache = QueryCache::default();
        let mut rx = cache.subscribe();

        cache.invalidate_prefix(&key(&["sensor"])).await;
        let event = rx.recv().await.unwrap();
        assert!(event.invalidates(&key(&["sensor", "latest", "p1"])));
        assert!(!event.invalidates(&key(&["plants"])));

        cache.invalidate(&key(&["plants"])).await;
        let event = rx.recv().await.unwrap();
        assert!(event.invalidates(&key(&["plants"])));
        assert!(!event.invalidates(&key(&["plants", "latest"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_garbage() {
        let cache = QueryCache::new(CacheConfig::default().gc_time(Duration::from_secs(60)));
        let mut rx = cache.subscribe();
        cache.insert(key(&["old"]), Arc::new(1_u8)).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        cache.insert(key(&["new"]), Arc::new(2_u8)).await;

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(cache.collect_garbage().await, 1);
        assert_eq!(cache.keys().await, vec![key(&["new"])]);
        assert_eq!(
            rx.recv().await.unwrap(),
            CacheEvent::Evicted { key: key(&["old"]) }
        );
    }

    #[tokio::test]
    async fn test_fetch_lock_is_shared_per_key() {
        let cache = QueryCache::default();
        let a = cache.fetch_lock(&key(&["plants"])).await;
        let b = cache.fetch_lock(&key(&["plants"])).await;
        let c = cache.fetch_lock(&key(&["plant", "p1"])).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    proptest! {
        #[test]
        fn key_starts_with_each_of_its_prefixes(
            segments in proptest::collection::vec("[a-z]{1,6}", 0..5),
            cut in 0usize..6,
        ) {
            let full = QueryKey::new(segments.clone());
            let cut = cut.min(segments.len());
            let prefix = QueryKey::new(segments[..cut].to_vec());
            prop_assert!(full.starts_with(&prefix));
            prop_assert!(full.starts_with(&QueryKey::new(Vec::<String>::new())));
        }

        #[test]
        fn longer_key_is_never_prefix(segments in proptest::collection::vec("[a-z]{1,6}", 0..5)) {
            let key = QueryKey::new(segments.clone());
            let mut longer = segments;
            longer.push("extra".to_string());
            prop_assert!(!key.starts_with(&QueryKey::new(longer)));
        }
    }
}
