//! Tests for the fallback cache and its stores.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::json;
use tempfile::TempDir;

use crate::cache::{
    CACHE_KEY, CacheEntry, CacheLookup, FallbackCache, FileStore, KeyValueStore, MemoryStore,
    StoreError,
};
use crate::time::Clock;

/// Mock clock whose time is shared with the test body.
#[derive(Debug, Clone)]
struct MockClock {
    millis: Arc<AtomicU64>,
}

impl MockClock {
    fn at(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap();
        self.millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Store whose every operation fails.
#[derive(Debug)]
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Read(io::Error::other("disk gone")))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Write(io::Error::other("disk gone")))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Write(io::Error::other("disk gone")))
    }
}

const NOW: u64 = 1_700_000_000_000;

fn cache_with(
    store: MemoryStore,
    ttl: Duration,
) -> (FallbackCache<MemoryStore, MockClock>, MockClock) {
    let clock = MockClock::at(NOW);
    (FallbackCache::with_clock(store, clock.clone(), ttl), clock)
}

fn put_entry(store: &MemoryStore, timestamp: u64, data: serde_json::Value) {
    let entry = CacheEntry { timestamp, data };
    store
        .set(CACHE_KEY, &serde_json::to_string(&entry).unwrap())
        .unwrap();
}

mod lookup_result {
    use super::*;

    #[test]
    fn into_payload_returns_hit_value() {
        let lookup = CacheLookup::Hit(json!({"flag": true}));
        assert_eq!(lookup.into_payload(), Some(json!({"flag": true})));
    }

    #[test]
    fn into_payload_is_none_otherwise() {
        assert_eq!(CacheLookup::Missing.into_payload(), None);
        assert_eq!(
            CacheLookup::Expired {
                age: Duration::from_secs(1)
            }
            .into_payload(),
            None
        );
        assert_eq!(
            CacheLookup::Corrupted {
                reason: "x".to_string()
            }
            .into_payload(),
            None
        );
    }

    #[test]
    fn is_hit_only_for_hit() {
        assert!(CacheLookup::Hit(json!(1)).is_hit());
        assert!(!CacheLookup::Missing.is_hit());
    }
}

mod fallback_cache {
    use super::*;

    #[test]
    fn round_trip_within_ttl() {
        let (cache, clock) = cache_with(MemoryStore::new(), Duration::from_secs(30));

        cache.write(&json!({"flag": true}));
        clock.advance(Duration::from_secs(29));

        assert_eq!(cache.read_if_valid(), Some(json!({"flag": true})));
    }

    #[test]
    fn entry_exactly_at_ttl_is_valid() {
        let (cache, clock) = cache_with(MemoryStore::new(), Duration::from_secs(30));

        cache.write(&json!("v"));
        clock.advance(Duration::from_secs(30));

        assert_eq!(cache.read_if_valid(), Some(json!("v")));
    }

    #[test]
    fn valid_read_does_not_evict() {
        let store = MemoryStore::new();
        let (cache, _clock) = cache_with(store.clone(), Duration::from_secs(30));

        cache.write(&json!(1));
        assert!(cache.read_if_valid().is_some());
        assert!(cache.read_if_valid().is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_entry_is_absent_and_evicted() {
        let store = MemoryStore::new();
        let (cache, clock) = cache_with(store.clone(), Duration::from_secs(30));

        cache.write(&json!({"flag": true}));
        clock.advance(Duration::from_millis(30_001));

        assert!(matches!(cache.lookup(), CacheLookup::Expired { .. }));
        assert!(store.get(CACHE_KEY).unwrap().is_none());
    }

    #[test]
    fn eviction_is_permanent() {
        let (cache, clock) = cache_with(MemoryStore::new(), Duration::from_secs(10));

        cache.write(&json!(1));
        clock.advance(Duration::from_secs(11));
        assert_eq!(cache.read_if_valid(), None);

        // Even with the clock moved back, the entry is gone
        clock.millis.store(NOW, Ordering::SeqCst);
        assert_eq!(cache.lookup(), CacheLookup::Missing);
    }

    #[test]
    fn five_second_old_entry_is_served_with_thirty_second_ttl() {
        let store = MemoryStore::new();
        put_entry(&store, NOW - 5_000, json!({"flag": false}));
        let (cache, _clock) = cache_with(store, Duration::from_millis(30_000));

        assert_eq!(cache.read_if_valid(), Some(json!({"flag": false})));
    }

    #[test]
    fn missing_entry_is_missing() {
        let (cache, _clock) = cache_with(MemoryStore::new(), Duration::from_secs(30));
        assert_eq!(cache.lookup(), CacheLookup::Missing);
    }

    #[test]
    fn unparsable_entry_is_evicted() {
        let store = MemoryStore::new();
        store.set(CACHE_KEY, "{not json").unwrap();
        let (cache, _clock) = cache_with(store.clone(), Duration::from_secs(30));

        assert!(matches!(cache.lookup(), CacheLookup::Corrupted { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn entry_missing_data_field_is_corrupted() {
        let store = MemoryStore::new();
        store.set(CACHE_KEY, r#"{"timestamp": 1}"#).unwrap();
        let (cache, _clock) = cache_with(store, Duration::from_secs(30));

        assert!(matches!(cache.lookup(), CacheLookup::Corrupted { .. }));
    }

    #[test]
    fn zero_ttl_disables_writes_and_reads() {
        let store = MemoryStore::new();
        let (cache, _clock) = cache_with(store.clone(), Duration::ZERO);

        cache.write(&json!(1));
        assert!(store.is_empty());

        put_entry(&store, NOW, json!(2));
        assert_eq!(cache.lookup(), CacheLookup::Missing);
        assert!(!cache.is_enabled());
    }

    #[test]
    fn clear_removes_entry() {
        let store = MemoryStore::new();
        put_entry(&store, NOW, json!(1));
        let (cache, _clock) = cache_with(store.clone(), Duration::ZERO);

        cache.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn write_stamps_entry_with_clock_millis() {
        let store = MemoryStore::new();
        let (cache, _clock) = cache_with(store.clone(), Duration::from_secs(1));

        cache.write(&json!([1, 2]));

        let raw = store.get(CACHE_KEY).unwrap().unwrap();
        let entry: CacheEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            entry,
            CacheEntry {
                timestamp: NOW,
                data: json!([1, 2])
            }
        );
    }

    #[test]
    fn broken_store_never_panics() {
        let cache = FallbackCache::with_clock(BrokenStore, MockClock::at(NOW), Duration::from_secs(1));

        cache.write(&json!(1));
        cache.clear();
        assert!(matches!(cache.lookup(), CacheLookup::Corrupted { .. }));
    }
}

mod file_store {
    use super::*;

    #[test]
    fn get_returns_none_for_missing_key() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.get(CACHE_KEY).unwrap().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.set(CACHE_KEY, r#"{"a":1}"#).unwrap();
        assert_eq!(store.get(CACHE_KEY).unwrap().as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn set_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("cache"));

        store.set("k", "v").unwrap();
        assert!(store.path_for("k").exists());
    }

    #[test]
    fn set_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.set("k", "v").unwrap();

        let temp = format!("{}.tmp", store.path_for("k").display());
        assert!(!std::path::Path::new(&temp).exists());
    }

    #[test]
    fn remove_deletes_file_and_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());

        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());

        store.remove("k").unwrap();
    }

    #[test]
    fn key_is_sanitized_into_file_name() {
        let store = FileStore::new("/var/cache/rw");
        assert_eq!(
            store.path_for(CACHE_KEY),
            std::path::PathBuf::from("/var/cache/rw/ruller-watch_last-data.json")
        );
    }

    #[test]
    fn survives_restart() {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::at(NOW);

        let first = FallbackCache::with_clock(FileStore::new(dir.path()), clock.clone(), Duration::from_secs(60));
        first.write(&json!({"flag": true}));
        drop(first);

        let second = FallbackCache::with_clock(FileStore::new(dir.path()), clock, Duration::from_secs(60));
        assert_eq!(second.read_if_valid(), Some(json!({"flag": true})));
    }
}
