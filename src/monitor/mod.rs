//! Change monitor for a remote decision endpoint.
//!
//! This module provides:
//! - The monitor handle and its builder ([`Monitor`], [`MonitorBuilder`])
//! - Mode parameters ([`PollingOptions`], [`MonitoringOptions`])
//! - Change detection ([`ChangeDetector`], [`canonical_eq`])
//! - Error handling ([`ConstructionError`], [`ConfigurationError`], [`WatchError`])
//!
//! A monitor evaluates the endpoint with its current input and delivers
//! the output to the change callback whenever it differs from the last
//! delivered one. Evaluations happen once at construction, on every
//! [`Monitor::set_input`], and then on the schedule of the active mode:
//! a fixed interval while polling, or each time the persistent connection
//! closes while monitoring.

mod builder;
mod change;
mod error;
mod options;
mod reactor;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use builder::MonitorBuilder;
pub use change::{ChangeCallback, ChangeDetector, Verdict, canonical_eq};
pub use error::{ConfigurationError, ConstructionError, WatchError};
pub use options::{
    DEFAULT_BACKOFF_MIN, DEFAULT_MONITOR_JITTER_MAX, DEFAULT_MONITOR_MAX_RETRY, MIN_POLL_INTERVAL,
    MonitoringOptions, PollingOptions,
};

use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::scheduler::{Generation, Mode, ModeKind};
use reactor::Command;

/// Callback invoked with each recoverable failure.
pub type ErrorCallback = Box<dyn FnMut(&WatchError) + Send>;

/// Handle to a running monitor.
///
/// Every method returns immediately; the work happens on a background
/// task. Dropping the handle stops that task, cancelling any pending timer
/// and closing any open connection.
///
/// Stop and start calls take effect synchronously: once they return, no
/// timer or connection armed before the call can trigger another fetch.
#[derive(Debug)]
pub struct Monitor {
    commands: UnboundedSender<Command>,
    generation: Generation,
    mode: Mutex<ModeKind>,
}

impl Monitor {
    /// Returns a builder with production collaborators.
    #[must_use]
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Returns the active mode.
    #[must_use]
    pub fn mode(&self) -> ModeKind {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the input and evaluates it immediately.
    ///
    /// The mode and its backoff are left untouched.
    pub fn set_input(&self, input: Value) {
        self.send(Command::SetInput(input));
    }

    /// Starts polling, stopping monitoring first if it is active.
    ///
    /// The first scheduled fetch happens one interval from now.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the options are invalid; the
    /// current mode is then kept.
    pub fn start_polling(&self, options: PollingOptions) -> Result<(), ConfigurationError> {
        let mode = options.into_mode()?;
        self.enter(mode);
        Ok(())
    }

    /// Stops polling. Does nothing unless polling is active.
    pub fn stop_polling(&self) {
        self.stop(ModeKind::Polling);
    }

    /// Starts monitoring, stopping polling first if it is active.
    ///
    /// The connection is opened right away.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the options are invalid; the
    /// current mode is then kept.
    pub fn start_monitoring(&self, options: MonitoringOptions) -> Result<(), ConfigurationError> {
        let mode = options.into_mode()?;
        self.enter(mode);
        Ok(())
    }

    /// Stops monitoring. Does nothing unless monitoring is active.
    pub fn stop_monitoring(&self) {
        self.stop(ModeKind::Monitoring);
    }

    fn enter(&self, mode: Mode) {
        let mut current = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        *current = mode.kind();
        self.generation.advance();
        self.send(Command::Enter(mode));
    }

    fn stop(&self, kind: ModeKind) {
        let mut current = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != kind {
            return;
        }
        *current = ModeKind::Idle;
        self.generation.advance();
        self.send(Command::Stop(kind));
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Monitor task is gone, command dropped");
        }
    }
}
