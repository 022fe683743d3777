//! Retry delays after consecutive failures.

use std::time::Duration;

use rand::Rng;

/// Delays shorter than this are never armed as timers.
///
/// When the policy yields a shorter delay the scheduler stops retrying on
/// its own; the caller has to trigger the next evaluation.
pub const MIN_ARMED_DELAY: Duration = Duration::from_secs(1);

/// Source of the randomized first-retry delay.
pub trait Jitter: Send {
    /// Picks a delay uniformly in `[min, max]`, at millisecond granularity.
    fn pick(&mut self, min: Duration, max: Duration) -> Duration;
}

impl<J: Jitter + ?Sized> Jitter for Box<J> {
    fn pick(&mut self, min: Duration, max: Duration) -> Duration {
        (**self).pick(min, max)
    }
}

/// [`Jitter`] backed by the thread-local `rand` generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn pick(&mut self, min: Duration, max: Duration) -> Duration {
        let low = as_millis(min);
        let high = as_millis(max).max(low);
        Duration::from_millis(rand::rng().random_range(low..=high))
    }
}

/// Delay schedule for retries after failed attempts.
///
/// # Sequence
///
/// | Retry | Delay |
/// |-------|-------|
/// | 1 | uniform random in `[min, max]` |
/// | 2 | `min` |
/// | n ≥ 3 | `min(previous * 2, max_retry_interval)` |
///
/// # Example
///
/// ```
/// use ruller_watch::scheduler::{BackoffPolicy, BackoffState, Jitter};
/// use std::time::Duration;
///
/// struct Lowest;
/// impl Jitter for Lowest {
///     fn pick(&mut self, min: Duration, _max: Duration) -> Duration {
///         min
///     }
/// }
///
/// let policy = BackoffPolicy::new(
///     Duration::from_secs(2),
///     Duration::from_secs(20),
///     Duration::from_secs(60),
/// );
/// let mut state = BackoffState::new();
///
/// assert_eq!(state.record_failure(&policy, &mut Lowest), Duration::from_secs(2));
/// assert_eq!(state.record_failure(&policy, &mut Lowest), Duration::from_secs(2));
/// assert_eq!(state.record_failure(&policy, &mut Lowest), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    min: Duration,
    max: Duration,
    max_retry_interval: Duration,
}

impl BackoffPolicy {
    /// Creates a policy.
    ///
    /// * `min` - lower jitter bound and the second retry delay
    /// * `max` - upper jitter bound for the first retry
    /// * `max_retry_interval` - ceiling for the third retry onward
    #[must_use]
    pub const fn new(min: Duration, max: Duration, max_retry_interval: Duration) -> Self {
        Self {
            min,
            max,
            max_retry_interval,
        }
    }

    /// Returns the lower jitter bound.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Returns the upper jitter bound.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Returns the ceiling for exponential retries.
    #[must_use]
    pub const fn max_retry_interval(&self) -> Duration {
        self.max_retry_interval
    }

    /// Computes the delay before retry number `retry` (1-based).
    ///
    /// `previous` is the delay used before the prior retry; it only
    /// matters from the third retry on.
    #[must_use]
    pub fn delay_for_retry(
        &self,
        retry: u32,
        previous: Option<Duration>,
        jitter: &mut dyn Jitter,
    ) -> Duration {
        match retry {
            0 => Duration::ZERO,
            1 => jitter.pick(self.min, self.max),
            2 => self.min,
            _ => previous
                .unwrap_or(self.min)
                .saturating_mul(2)
                .min(self.max_retry_interval),
        }
    }
}

/// Failure streak tracked between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackoffState {
    retry_count: u32,
    current_wait: Option<Duration>,
}

impl BackoffState {
    /// Creates a state with no failures recorded.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            retry_count: 0,
            current_wait: None,
        }
    }

    /// Returns the number of consecutive failures.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the delay computed for the latest failure.
    #[must_use]
    pub const fn current_wait(&self) -> Option<Duration> {
        self.current_wait
    }

    /// Returns `true` while at least one failure is outstanding.
    #[must_use]
    pub const fn is_retrying(&self) -> bool {
        self.retry_count > 0
    }

    /// Records a failure and returns the delay before the next attempt.
    pub fn record_failure(&mut self, policy: &BackoffPolicy, jitter: &mut dyn Jitter) -> Duration {
        self.retry_count = self.retry_count.saturating_add(1);
        let delay = policy.delay_for_retry(self.retry_count, self.current_wait, jitter);
        self.current_wait = Some(delay);
        delay
    }

    /// Clears the failure streak.
    pub const fn reset(&mut self) {
        self.retry_count = 0;
        self.current_wait = None;
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
