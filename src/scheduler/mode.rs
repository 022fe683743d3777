//! Delivery modes of the scheduler.

use std::fmt;
use std::time::Duration;

use url::Url;

use super::BackoffPolicy;

/// The active delivery strategy.
///
/// Polling and monitoring are mutually exclusive; each carries the backoff
/// policy used while it is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Nothing is scheduled.
    Idle,
    /// Evaluate the endpoint every `interval`.
    Polling {
        /// Delay between successful evaluations
        interval: Duration,
        /// Retry schedule after failures
        backoff: BackoffPolicy,
    },
    /// Hold a persistent connection to `url`; re-evaluate when it closes.
    Monitoring {
        /// Connection target
        url: Url,
        /// Retry schedule after failures and closes
        backoff: BackoffPolicy,
    },
}

impl Mode {
    /// Returns the discriminant without its parameters.
    #[must_use]
    pub const fn kind(&self) -> ModeKind {
        match self {
            Self::Idle => ModeKind::Idle,
            Self::Polling { .. } => ModeKind::Polling,
            Self::Monitoring { .. } => ModeKind::Monitoring,
        }
    }

    /// Returns the backoff policy of an active mode.
    #[must_use]
    pub const fn backoff(&self) -> Option<&BackoffPolicy> {
        match self {
            Self::Idle => None,
            Self::Polling { backoff, .. } | Self::Monitoring { backoff, .. } => Some(backoff),
        }
    }

    /// Returns `true` for [`Mode::Idle`].
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Parameterless view of a [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeKind {
    /// No mode active
    #[default]
    Idle,
    /// Polling active
    Polling,
    /// Monitoring active
    Monitoring,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Monitoring => "monitoring",
        };
        f.write_str(label)
    }
}
