//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

/// Default polling interval in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 60_000;

/// Default cache time-to-live in milliseconds (cache disabled).
pub const CACHE_TTL_MS: u64 = 0;

/// Default polling interval as Duration.
#[must_use]
pub const fn poll_interval() -> Duration {
    Duration::from_millis(POLL_INTERVAL_MS)
}

/// Default cache time-to-live as Duration.
#[must_use]
pub const fn cache_ttl() -> Duration {
    Duration::from_millis(CACHE_TTL_MS)
}
