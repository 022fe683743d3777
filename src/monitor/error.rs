//! Error types for the monitor layer.

use thiserror::Error;

use crate::transport::{ConnectionError, FetchError};

/// Error returned when a monitor cannot be built.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// No endpoint was given.
    #[error("An endpoint is required")]
    MissingEndpoint,

    /// No change callback was given.
    #[error("A change callback is required")]
    MissingChangeCallback,

    /// The endpoint is not a valid URL.
    #[error("Invalid endpoint URL '{url}': {source}")]
    InvalidEndpoint {
        /// The rejected URL
        url: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },

    /// `build` was called outside a Tokio runtime.
    #[error("A Tokio runtime is required to run the monitor")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),
}

/// Error returned by `start_polling` and `start_monitoring` for invalid
/// schedule parameters.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The polling interval is below the floor.
    #[error(
        "Polling interval {}ms is below the minimum of {}ms",
        .interval.as_millis(),
        .minimum.as_millis()
    )]
    IntervalTooShort {
        /// Requested interval
        interval: std::time::Duration,
        /// Smallest accepted interval
        minimum: std::time::Duration,
    },

    /// The first-retry jitter ceiling is below the base delay.
    #[error(
        "Jitter ceiling {}ms is below the base delay of {}ms",
        .jitter_max.as_millis(),
        .base.as_millis()
    )]
    JitterBelowBase {
        /// Requested jitter ceiling
        jitter_max: std::time::Duration,
        /// Base delay it must not undercut
        base: std::time::Duration,
    },

    /// The retry ceiling is below the base delay.
    #[error(
        "Retry ceiling {}ms is below the base delay of {}ms",
        .max_retry.as_millis(),
        .base.as_millis()
    )]
    MaxRetryBelowBase {
        /// Requested retry ceiling
        max_retry: std::time::Duration,
        /// Base delay it must not undercut
        base: std::time::Duration,
    },

    /// The monitoring URL is not a valid URL.
    #[error("Invalid monitoring URL '{url}': {source}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },
}

/// Recoverable failure reported to the error callback.
///
/// Both variants are followed by a cache fallback and, while a mode is
/// active, a backoff retry.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Evaluating the endpoint failed.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The monitoring connection closed or could not be opened.
    #[error("{0}")]
    Connection(#[from] ConnectionError),
}
