//! Parameters of the two delivery modes.

use std::time::Duration;

use url::Url;

use super::ConfigurationError;
use crate::scheduler::{BackoffPolicy, Mode};

/// Smallest accepted polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default base delay of the monitoring backoff.
pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_millis(2_000);

/// Default first-retry jitter ceiling of the monitoring backoff.
pub const DEFAULT_MONITOR_JITTER_MAX: Duration = Duration::from_millis(12_000);

/// Default retry ceiling of the monitoring backoff.
pub const DEFAULT_MONITOR_MAX_RETRY: Duration = Duration::from_millis(30_000);

/// Options for `Monitor::start_polling`.
///
/// The interval doubles as the backoff base. Unless set, the jitter ceiling
/// is three intervals and the retry ceiling six.
///
/// # Example
///
/// ```
/// use ruller_watch::monitor::PollingOptions;
/// use std::time::Duration;
///
/// let options = PollingOptions::new(Duration::from_secs(5))
///     .with_max_retry(Duration::from_secs(60));
/// assert!(options.into_mode().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingOptions {
    interval: Duration,
    jitter_max: Option<Duration>,
    max_retry: Option<Duration>,
}

impl PollingOptions {
    /// Polls every `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            jitter_max: None,
            max_retry: None,
        }
    }

    /// Sets the first-retry jitter ceiling.
    #[must_use]
    pub const fn with_jitter_max(mut self, jitter_max: Duration) -> Self {
        self.jitter_max = Some(jitter_max);
        self
    }

    /// Sets the retry ceiling.
    #[must_use]
    pub const fn with_max_retry(mut self, max_retry: Duration) -> Self {
        self.max_retry = Some(max_retry);
        self
    }

    /// Returns the polling interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Validates the options and resolves defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the interval is below
    /// [`MIN_POLL_INTERVAL`] or either ceiling is below the interval.
    pub fn into_mode(self) -> Result<Mode, ConfigurationError> {
        let interval = self.interval;
        if interval < MIN_POLL_INTERVAL {
            return Err(ConfigurationError::IntervalTooShort {
                interval,
                minimum: MIN_POLL_INTERVAL,
            });
        }

        let jitter_max = self.jitter_max.unwrap_or_else(|| interval.saturating_mul(3));
        let max_retry = self.max_retry.unwrap_or_else(|| interval.saturating_mul(6));
        let backoff = checked_policy(interval, jitter_max, max_retry)?;

        Ok(Mode::Polling { interval, backoff })
    }
}

/// Options for `Monitor::start_monitoring`.
///
/// Defaults: base delay 2s, jitter ceiling 12s, retry ceiling 30s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoringOptions {
    url: String,
    backoff_min: Duration,
    jitter_max: Duration,
    max_retry: Duration,
}

impl MonitoringOptions {
    /// Monitors the persistent connection at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff_min: DEFAULT_BACKOFF_MIN,
            jitter_max: DEFAULT_MONITOR_JITTER_MAX,
            max_retry: DEFAULT_MONITOR_MAX_RETRY,
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_backoff_min(mut self, backoff_min: Duration) -> Self {
        self.backoff_min = backoff_min;
        self
    }

    /// Sets the first-retry jitter ceiling.
    #[must_use]
    pub const fn with_jitter_max(mut self, jitter_max: Duration) -> Self {
        self.jitter_max = jitter_max;
        self
    }

    /// Sets the retry ceiling.
    #[must_use]
    pub const fn with_max_retry(mut self, max_retry: Duration) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Returns the connection URL as given.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the URL does not parse or either
    /// ceiling is below the base delay.
    pub fn into_mode(self) -> Result<Mode, ConfigurationError> {
        let url = Url::parse(&self.url).map_err(|source| ConfigurationError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        let backoff = checked_policy(self.backoff_min, self.jitter_max, self.max_retry)?;

        Ok(Mode::Monitoring { url, backoff })
    }
}

fn checked_policy(
    base: Duration,
    jitter_max: Duration,
    max_retry: Duration,
) -> Result<BackoffPolicy, ConfigurationError> {
    if jitter_max < base {
        return Err(ConfigurationError::JitterBelowBase { jitter_max, base });
    }
    if max_retry < base {
        return Err(ConfigurationError::MaxRetryBelowBase { max_retry, base });
    }
    Ok(BackoffPolicy::new(base, jitter_max, max_retry))
}
