//! Cache manager for persisting view payloads with a time-to-live
//!
//! Provides a `CacheManager` that stores serializable data in a durable
//! [`Store`] together with its capture time and TTL. Unlike a fallback
//! cache, stale entries are never handed back: they are purged on read and
//! reported as a miss.

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::store::{MemoryStore, Store};

/// Default key prefix separating cache entries from unrelated storage
pub const DEFAULT_NAMESPACE: &str = "vendordash_cache_";

/// Wrapper stored for every entry
///
/// Exactly three fields are persisted: the payload, the capture time in
/// epoch milliseconds and the time-to-live in milliseconds.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// When the payload was captured (epoch ms)
    pub timestamp: i64,
    /// How long the payload stays fresh (ms)
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    /// An entry is fresh while `now - timestamp < ttl`
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        i128::from(now_ms) - i128::from(self.timestamp) < i128::from(self.ttl)
    }
}

/// Read-through TTL cache over a durable store
///
/// Every operation is infallible from the caller's point of view. Storage
/// and parse failures are logged and turn into a no-op or a miss.
///
/// Cloning is cheap; clones share the same store and clock.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    namespace: String,
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    /// Creates a cache over `store` using wall-clock time and the default namespace
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Creates a process-local cache, mostly useful in tests
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the key prefix
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// A manager over the same store with `scope` appended to the namespace
    ///
    /// Entries written through it are invisible to other scopes but are still
    /// cleared by `invalidate` on the unscoped manager.
    pub fn scoped(&self, scope: &str) -> Self {
        let namespace = format!("{}{}:", self.namespace, scope);
        self.clone().with_namespace(namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The clock used for freshness checks
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Stores `data` under `key`, fresh for `ttl_ms` milliseconds
    ///
    /// Failures are swallowed: caching is best-effort.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl_ms: u64) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_ms(),
            ttl: ttl_ms,
        };

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(cache = key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set_item(&self.storage_key(key), &json) {
            debug!(cache = key, error = %e, "Failed to persist cache entry");
        }
    }

    /// Returns the payload under `key` if present and fresh
    ///
    /// Stale or unreadable entries are deleted and reported as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);

        let raw = match self.store.get_item(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(cache = key, "Cache miss");
                return None;
            }
            Err(e) => {
                debug!(cache = key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(cache = key, error = %e, "Discarding unreadable cache entry");
                self.purge(&storage_key);
                return None;
            }
        };

        if !entry.is_fresh(self.clock.now_ms()) {
            debug!(cache = key, "Discarding stale cache entry");
            self.purge(&storage_key);
            return None;
        }

        Some(entry.data)
    }

    /// Deletes the entry under `key`; absent keys are a no-op
    pub fn remove(&self, key: &str) {
        self.purge(&self.storage_key(key));
    }

    /// Deletes every entry in the namespace whose key contains `pattern`
    ///
    /// With no pattern, deletes every entry in the namespace. Keys outside
    /// the namespace are left alone.
    pub fn invalidate(&self, pattern: Option<&str>) {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                debug!(error = %e, "Failed to list cache entries for invalidation");
                return;
            }
        };

        for storage_key in keys {
            let Some(key) = storage_key.strip_prefix(&self.namespace) else {
                continue;
            };
            if pattern.map_or(true, |p| key.contains(p)) {
                self.purge(&storage_key);
            }
        }
    }

    fn purge(&self, storage_key: &str) {
        if let Err(e) = self.store.remove_item(storage_key) {
            debug!(key = storage_key, error = %e, "Failed to remove cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::store::{FileStore, StoreError};
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counts {
        requests: u32,
    }

    /// Store that refuses every operation, like disabled local storage
    struct FailingStore;

    impl Store for FailingStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disabled".to_string()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("quota exceeded".to_string()))
        }
        fn remove_item(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disabled".to_string()))
        }
        fn keys(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("disabled".to_string()))
        }
    }

    fn create_test_cache() -> (CacheManager, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let cache = CacheManager::new(store.clone()).with_clock(clock.clone());
        (cache, store, clock)
    }

    #[test]
    fn test_get_after_set_returns_data() {
        let (cache, _store, _clock) = create_test_cache();
        cache.set("dashboard", &Counts { requests: 3 }, 1);
        assert_eq!(cache.get::<Counts>("dashboard"), Some(Counts { requests: 3 }));
    }

    #[test]
    fn test_missing_key_is_none() {
        let (cache, _store, _clock) = create_test_cache();
        assert_eq!(cache.get::<Counts>("nothing"), None);
    }

    #[test]
    fn test_expiry_boundary() {
        let (cache, _store, clock) = create_test_cache();
        cache.set("dashboard", &Counts { requests: 3 }, 120_000);

        clock.set(119_999);
        assert_eq!(cache.get::<Counts>("dashboard"), Some(Counts { requests: 3 }));

        // Exactly ttl elapsed is already stale
        clock.set(120_000);
        assert_eq!(cache.get::<Counts>("dashboard"), None);
    }

    #[test]
    fn test_stale_read_purges_entry() {
        let (cache, store, clock) = create_test_cache();
        cache.set("packages", &vec!["a"], 60_000);
        clock.advance(60_001);

        assert_eq!(cache.get::<Vec<String>>("packages"), None);
        assert!(store.get_item("vendordash_cache_packages").unwrap().is_none());
        // Second read is still a miss and leaves nothing behind
        assert_eq!(cache.get::<Vec<String>>("packages"), None);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let (cache, _store, _clock) = create_test_cache();
        cache.set("k", &1u8, 0);
        assert_eq!(cache.get::<u8>("k"), None);
    }

    #[test]
    fn test_set_replaces_and_restarts_ttl() {
        let (cache, _store, clock) = create_test_cache();
        cache.set("k", &Counts { requests: 1 }, 1_000);
        clock.advance(900);
        cache.set("k", &Counts { requests: 2 }, 1_000);
        clock.advance(900);
        assert_eq!(cache.get::<Counts>("k"), Some(Counts { requests: 2 }));
    }

    #[test]
    fn test_persisted_value_has_three_fields() {
        let (cache, store, clock) = create_test_cache();
        clock.set(1_700_000_000_000);
        cache.set("dashboard", &Counts { requests: 3 }, 120_000);

        let raw = store.get_item("vendordash_cache_dashboard").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["data"]["requests"], 3);
        assert_eq!(object["timestamp"], 1_700_000_000_000i64);
        assert_eq!(object["ttl"], 120_000);
    }

    #[test]
    fn test_corrupt_entry_is_miss_and_purged() {
        let (cache, store, _clock) = create_test_cache();
        store.set_item("vendordash_cache_k", "{not json").unwrap();

        assert_eq!(cache.get::<Counts>("k"), None);
        assert!(store.get_item("vendordash_cache_k").unwrap().is_none());
    }

    #[test]
    fn test_wrong_shape_is_miss() {
        let (cache, _store, _clock) = create_test_cache();
        cache.set("k", &"a string", 60_000);
        assert_eq!(cache.get::<Counts>("k"), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (cache, _store, _clock) = create_test_cache();
        cache.set("k", &1u8, 60_000);
        cache.remove("k");
        cache.remove("k");
        assert_eq!(cache.get::<u8>("k"), None);
    }

    #[test]
    fn test_invalidate_all_only_touches_namespace() {
        let (cache, store, _clock) = create_test_cache();
        store.set_item("unrelated_setting", "keep me").unwrap();
        cache.set("dashboard", &1u8, 60_000);
        cache.set("packages", &2u8, 60_000);

        cache.invalidate(None);

        assert_eq!(cache.get::<u8>("dashboard"), None);
        assert_eq!(cache.get::<u8>("packages"), None);
        assert_eq!(store.get_item("unrelated_setting").unwrap().as_deref(), Some("keep me"));
    }

    #[test]
    fn test_invalidate_pattern() {
        let (cache, _store, _clock) = create_test_cache();
        cache.set("a-1", &1u8, 60_000);
        cache.set("a-2", &2u8, 60_000);
        cache.set("b-1", &3u8, 60_000);

        cache.invalidate(Some("a"));

        assert_eq!(cache.get::<u8>("a-1"), None);
        assert_eq!(cache.get::<u8>("a-2"), None);
        assert_eq!(cache.get::<u8>("b-1"), Some(3));
    }

    #[test]
    fn test_pattern_matches_logical_key_not_prefix() {
        let (cache, _store, _clock) = create_test_cache();
        cache.set("packages", &1u8, 60_000);
        // "cache" appears in the namespace but not in the logical key
        cache.invalidate(Some("cache"));
        assert_eq!(cache.get::<u8>("packages"), Some(1));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let first = CacheManager::new(store.clone()).with_namespace("one_");
        let second = CacheManager::new(store).with_namespace("two_");

        first.set("k", &1u8, 60_000);
        second.set("k", &2u8, 60_000);
        first.invalidate(None);

        assert_eq!(first.get::<u8>("k"), None);
        assert_eq!(second.get::<u8>("k"), Some(2));
    }

    #[test]
    fn test_scoped_managers_do_not_share_entries() {
        let (cache, _store, _clock) = create_test_cache();
        let vendor_a = cache.scoped("vendor-a");
        let vendor_b = cache.scoped("vendor-b");

        vendor_a.set("packages", &1, 60_000);
        assert_eq!(vendor_a.namespace(), "vendordash_cache_vendor-a:");
        assert_eq!(vendor_b.get::<i32>("packages"), None);
        assert_eq!(cache.get::<i32>("packages"), None);

        vendor_b.set("packages", &2, 60_000);
        vendor_b.invalidate(None);
        assert_eq!(vendor_a.get::<i32>("packages"), Some(1));

        // The unscoped manager still clears every scope
        cache.invalidate(Some("pack"));
        assert_eq!(vendor_a.get::<i32>("packages"), None);
    }

    #[test]
    fn test_failing_store_never_errors() {
        let cache = CacheManager::new(Arc::new(FailingStore));
        cache.set("k", &Counts { requests: 1 }, 60_000);
        assert_eq!(cache.get::<Counts>("k"), None);
        cache.remove("k");
        cache.invalidate(None);
        cache.invalidate(Some("k"));
    }

    #[test]
    fn test_file_backed_cache_survives_new_manager() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(FileStore::with_dir(temp_dir.path().to_path_buf()));

        CacheManager::new(store.clone())
            .with_clock(clock.clone())
            .set("packages", &vec![1, 2, 3], 60_000);

        let reopened = CacheManager::new(store).with_clock(clock);
        assert_eq!(reopened.get::<Vec<i32>>("packages"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_entry_is_fresh_handles_extremes() {
        let entry = CacheEntry {
            data: (),
            timestamp: 0,
            ttl: u64::MAX,
        };
        assert!(entry.is_fresh(i64::MAX));

        let old = CacheEntry {
            data: (),
            timestamp: i64::MIN,
            ttl: 1,
        };
        assert!(!old.is_fresh(i64::MAX));
    }
}
