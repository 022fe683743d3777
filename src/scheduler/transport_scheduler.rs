//! Timer and connection slot of a monitor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use url::Url;

use super::{BackoffState, Jitter, MIN_ARMED_DELAY, Mode, ModeKind, RandomJitter};
use crate::transport::{ConnectionError, ConnectionEvent, Connector};

/// Counter shared between a monitor handle and its scheduler.
///
/// Every armed timer and connection is tagged with the value current at
/// arming time. Advancing the counter makes all outstanding tags stale, so
/// their events are discarded when they arrive.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current generation.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidates every outstanding tag and returns the new generation.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns `true` if `generation` has not been superseded.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// Event posted back to the owner of a [`TransportScheduler`].
#[derive(Debug)]
pub enum Wakeup {
    /// An armed timer elapsed.
    TimerFired {
        /// Generation the timer was armed in
        generation: u64,
    },
    /// The open connection reported an event.
    Connection {
        /// Generation the connection was opened in
        generation: u64,
        /// What happened
        event: ConnectionEvent,
    },
}

/// Result of the attempt that precedes an [`TransportScheduler::arm`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The endpoint answered with an output.
    Success,
    /// The fetch failed or the connection closed.
    Failure,
}

/// What [`TransportScheduler::arm`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Armed {
    /// No mode is active.
    Inactive,
    /// A timer or connection was already outstanding and was kept.
    Overlapped,
    /// A one-shot timer was armed.
    Timer(Duration),
    /// The retry delay was below [`MIN_ARMED_DELAY`]; nothing was armed.
    BelowFloor(Duration),
    /// A persistent connection is being opened.
    Connection,
}

/// Aborts the owned task when dropped.
#[derive(Debug)]
struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The single outstanding schedule.
///
/// The guards are never read; dropping them aborts the task.
#[derive(Debug)]
enum Slot {
    Idle,
    Scheduled { _guard: TaskGuard },
    Connected { _guard: TaskGuard },
}

impl Slot {
    const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Decides when the next scheduled fetch happens.
///
/// Owns the active [`Mode`], the failure streak and one slot that holds
/// either a pending timer or an open connection, never both. Timer and
/// connection tasks report back through the [`Wakeup`] channel; the owner
/// feeds those wakeups into [`on_timer_fired`](Self::on_timer_fired) and
/// [`on_connection_event`](Self::on_connection_event).
///
/// Replacing the slot aborts the previous task, which drops its
/// connection stream and closes the connection.
pub struct TransportScheduler<K> {
    connector: K,
    jitter: Box<dyn Jitter>,
    mode: Mode,
    slot: Slot,
    backoff: BackoffState,
    generation: Generation,
    wakeups: UnboundedSender<Wakeup>,
}

impl<K: Connector> TransportScheduler<K> {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new(connector: K, generation: Generation, wakeups: UnboundedSender<Wakeup>) -> Self {
        Self {
            connector,
            jitter: Box::new(RandomJitter),
            mode: Mode::Idle,
            slot: Slot::Idle,
            backoff: BackoffState::new(),
            generation,
            wakeups,
        }
    }

    /// Replaces the source of first-retry jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.jitter = Box::new(jitter);
        self
    }

    /// Returns the active mode.
    #[must_use]
    pub const fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Returns the failure streak.
    #[must_use]
    pub const fn backoff(&self) -> &BackoffState {
        &self.backoff
    }

    /// Returns the shared generation counter.
    #[must_use]
    pub const fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Returns `true` while a timer or connection is outstanding.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        !self.slot.is_idle()
    }

    /// Returns `true` while a connection is outstanding.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.slot, Slot::Connected { .. })
    }

    /// Stops the current mode, switches to `mode` and arms it.
    pub fn enter(&mut self, mode: Mode) -> Armed {
        self.stop();
        if mode.is_idle() {
            return Armed::Inactive;
        }

        tracing::debug!("Entering {} mode", mode.kind());
        self.mode = mode;
        self.arm(Outcome::Success)
    }

    /// Cancels the outstanding timer or connection and returns to idle.
    pub fn stop(&mut self) {
        if !self.mode.is_idle() {
            tracing::debug!("Leaving {} mode", self.mode.kind());
        }
        self.slot = Slot::Idle;
        self.mode = Mode::Idle;
        self.backoff.reset();
        self.generation.advance();
    }

    /// Stops only if `kind` is the active mode. Returns whether it stopped.
    pub fn stop_if(&mut self, kind: ModeKind) -> bool {
        if kind == ModeKind::Idle || self.mode.kind() != kind {
            return false;
        }
        self.stop();
        true
    }

    /// Arms the next attempt after an attempt finished with `outcome`.
    ///
    /// A failure advances the backoff and arms a retry timer; a success
    /// resets it and arms the mode's regular schedule. Nothing happens
    /// while a timer or connection is still outstanding.
    pub fn arm(&mut self, outcome: Outcome) -> Armed {
        let Some(policy) = self.mode.backoff().copied() else {
            return Armed::Inactive;
        };

        if !self.slot.is_idle() {
            tracing::debug!("Skipping overlapped schedule");
            return Armed::Overlapped;
        }

        match outcome {
            Outcome::Failure => {
                let delay = self.backoff.record_failure(&policy, self.jitter.as_mut());
                if delay < MIN_ARMED_DELAY {
                    tracing::debug!(
                        "Retry delay {}ms is below the floor, not retrying",
                        delay.as_millis()
                    );
                    return Armed::BelowFloor(delay);
                }

                tracing::debug!(
                    "Retry {} in {}ms",
                    self.backoff.retry_count(),
                    delay.as_millis()
                );
                self.arm_timer(delay);
                return Armed::Timer(delay);
            }
            Outcome::Success => {
                if self.backoff.is_retrying() {
                    tracing::info!(
                        "Connection restored after {} failed attempts",
                        self.backoff.retry_count()
                    );
                }
                self.backoff.reset();
            }
        }

        match &self.mode {
            Mode::Idle => Armed::Inactive,
            Mode::Polling { interval, .. } => {
                let interval = *interval;
                self.arm_timer(interval);
                Armed::Timer(interval)
            }
            Mode::Monitoring { url, .. } => {
                let url = url.clone();
                self.open_connection(&url);
                Armed::Connection
            }
        }
    }

    /// Handles a [`Wakeup::TimerFired`].
    ///
    /// Returns `true` if the timer is still current, in which case the slot
    /// is released and the owner should run a scheduled fetch.
    pub fn on_timer_fired(&mut self, generation: u64) -> bool {
        if !self.generation.is_current(generation) {
            tracing::debug!("Discarding stale timer from generation {generation}");
            return false;
        }
        if !matches!(self.slot, Slot::Scheduled { .. }) {
            return false;
        }
        self.slot = Slot::Idle;
        true
    }

    /// Handles a [`Wakeup::Connection`].
    ///
    /// Returns the close reason if the current connection closed; the slot
    /// is then released and the owner should treat it as a failure.
    pub fn on_connection_event(
        &mut self,
        generation: u64,
        event: ConnectionEvent,
    ) -> Option<ConnectionError> {
        if !self.generation.is_current(generation) {
            tracing::debug!("Discarding stale connection event from generation {generation}");
            return None;
        }

        match event {
            ConnectionEvent::Opened => {
                tracing::debug!("Connection open");
                None
            }
            ConnectionEvent::Message => None,
            ConnectionEvent::Closed(reason) => {
                if !self.is_connected() {
                    return None;
                }
                self.slot = Slot::Idle;
                Some(reason)
            }
        }
    }

    fn arm_timer(&mut self, delay: Duration) {
        let generation = self.generation.current();
        let wakeups = self.wakeups.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = wakeups.send(Wakeup::TimerFired { generation });
        });
        self.slot = Slot::Scheduled {
            _guard: TaskGuard(handle),
        };
    }

    fn open_connection(&mut self, url: &Url) {
        tracing::debug!("Opening connection to {url}");
        let generation = self.generation.current();
        let wakeups = self.wakeups.clone();
        let mut events = self.connector.open(url);
        let handle = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let terminal = event.is_terminal();
                if wakeups.send(Wakeup::Connection { generation, event }).is_err() || terminal {
                    return;
                }
            }
            let event = ConnectionEvent::Closed(ConnectionError::closed("stream ended"));
            let _ = wakeups.send(Wakeup::Connection { generation, event });
        });
        self.slot = Slot::Connected {
            _guard: TaskGuard(handle),
        };
    }
}

impl<K> std::fmt::Debug for TransportScheduler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportScheduler")
            .field("mode", &self.mode)
            .field("slot", &self.slot)
            .field("backoff", &self.backoff)
            .field("generation", &self.generation.current())
            .finish_non_exhaustive()
    }
}
