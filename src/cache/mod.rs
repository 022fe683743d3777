//! Fallback cache for the last known good output.
//!
//! When the decision endpoint is unreachable, the monitor can still
//! deliver the most recent output it saw, as long as that output is
//! younger than a caller-defined time-to-live.
//!
//! The cache is a single `{timestamp, data}` entry stored under a fixed key
//! in a [`KeyValueStore`]. It is written after every successful fetch and
//! read only when a fetch fails.

mod file;
mod memory;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::time::{Clock, SystemClock, unix_millis};

/// Key under which the cached output is stored.
pub const CACHE_KEY: &str = "ruller-watch:last-data";

/// Errors reported by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read the stored value.
    #[error("Failed to read cache entry: {0}")]
    Read(#[source] io::Error),

    /// Failed to write or remove the stored value.
    #[error("Failed to write cache entry: {0}")]
    Write(#[source] io::Error),
}

/// Minimal string key-value persistence.
///
/// Implementations should:
/// - Return `Ok(None)` for keys that were never set or were removed
/// - Treat removing a missing key as success
/// - Make `set` atomic, so a crash never leaves a half-written value
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the value exists but cannot be removed.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// On-store format of the cached output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Milliseconds since the Unix epoch when the output was fetched.
    pub timestamp: u64,
    /// The cached output.
    pub data: Value,
}

/// Result of looking up the cache.
///
/// Models every state explicitly, as the persisted entry may be absent,
/// stale, or unreadable independently of the endpoint's health.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// A valid entry within the time-to-live.
    Hit(Value),

    /// No entry is stored, or the cache is disabled.
    Missing,

    /// The entry was older than the time-to-live and has been evicted.
    Expired {
        /// Age of the evicted entry.
        age: Duration,
    },

    /// The entry could not be read or parsed and has been evicted.
    Corrupted {
        /// Reason for corruption (for logging/debugging).
        reason: String,
    },
}

impl CacheLookup {
    /// Returns the cached output for `Hit`, `None` otherwise.
    #[must_use]
    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Missing | Self::Expired { .. } | Self::Corrupted { .. } => None,
        }
    }

    /// Returns `true` for a valid entry.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Time-bounded fallback cache over a [`KeyValueStore`].
///
/// A zero time-to-live disables the cache: writes and reads are no-ops.
///
/// # Type Parameters
///
/// * `S` - The backing store
/// * `C` - The [`Clock`] used to stamp and age entries (defaults to [`SystemClock`])
#[derive(Debug)]
pub struct FallbackCache<S, C = SystemClock> {
    store: S,
    clock: C,
    ttl: Duration,
}

impl<S: KeyValueStore> FallbackCache<S, SystemClock> {
    /// Creates a cache on `store` with the system clock.
    #[must_use]
    pub const fn new(store: S, ttl: Duration) -> Self {
        Self::with_clock(store, SystemClock, ttl)
    }
}

impl<S: KeyValueStore, C: Clock> FallbackCache<S, C> {
    /// Creates a cache with a custom clock.
    #[must_use]
    pub const fn with_clock(store: S, clock: C, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Returns the configured time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns `true` unless the time-to-live is zero.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Returns the backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Stores `payload` stamped with the current time.
    ///
    /// Store failures are logged and never reach the caller.
    pub fn write(&self, payload: &Value) {
        if !self.is_enabled() {
            return;
        }

        let entry = CacheEntry {
            timestamp: unix_millis(self.clock.now()),
            data: payload.clone(),
        };

        let result = serde_json::to_string(&entry)
            .map_err(|e| e.to_string())
            .and_then(|encoded| {
                self.store
                    .set(CACHE_KEY, &encoded)
                    .map_err(|e| e.to_string())
            });

        if let Err(reason) = result {
            tracing::warn!("Failed to update fallback cache: {reason}");
        }
    }

    /// Looks up the cached output, evicting it if it is stale or unreadable.
    ///
    /// Eviction is permanent: once an entry is found expired it is never
    /// served again, even if looked up before the next write.
    pub fn lookup(&self) -> CacheLookup {
        if !self.is_enabled() {
            return CacheLookup::Missing;
        }

        let raw = match self.store.get(CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheLookup::Missing,
            Err(e) => return self.evict_corrupted(e.to_string()),
        };

        let entry = match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => entry,
            Err(e) => return self.evict_corrupted(format!("Invalid JSON: {e}")),
        };

        let now = unix_millis(self.clock.now());
        let age = Duration::from_millis(now.saturating_sub(entry.timestamp));

        if age > self.ttl {
            tracing::debug!("Fallback cache expired ({}ms old)", age.as_millis());
            self.clear();
            return CacheLookup::Expired { age };
        }

        CacheLookup::Hit(entry.data)
    }

    /// Returns the cached output if it is still within the time-to-live.
    #[must_use]
    pub fn read_if_valid(&self) -> Option<Value> {
        self.lookup().into_payload()
    }

    /// Removes any stored entry.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(CACHE_KEY) {
            tracing::warn!("Failed to clear fallback cache: {e}");
        }
    }

    fn evict_corrupted(&self, reason: String) -> CacheLookup {
        tracing::warn!("Fallback cache unreadable ({reason}), evicting");
        self.clear();
        CacheLookup::Corrupted { reason }
    }
}
