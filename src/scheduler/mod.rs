//! Scheduling of fetch attempts.
//!
//! This module provides:
//! - The delivery modes ([`Mode`], [`ModeKind`])
//! - Retry delays after failures ([`BackoffPolicy`], [`BackoffState`])
//! - The slot holding the single outstanding timer or connection
//!   ([`TransportScheduler`])

mod backoff;
mod mode;
mod transport_scheduler;

#[cfg(test)]
mod transport_scheduler_tests;

pub use backoff::{BackoffPolicy, BackoffState, Jitter, MIN_ARMED_DELAY, RandomJitter};
pub use mode::{Mode, ModeKind};
pub use transport_scheduler::{Armed, Generation, Outcome, TransportScheduler, Wakeup};
