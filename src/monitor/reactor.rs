//! Event loop behind a [`super::Monitor`] handle.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use url::Url;

use super::{ChangeDetector, ErrorCallback, WatchError};
use crate::cache::{FallbackCache, KeyValueStore};
use crate::scheduler::{Mode, ModeKind, Outcome, TransportScheduler, Wakeup};
use crate::time::Clock;
use crate::transport::{Connector, FetchError, HttpClient, evaluate};

/// Request sent from the handle to the reactor.
#[derive(Debug)]
pub(super) enum Command {
    SetInput(Value),
    Enter(Mode),
    Stop(ModeKind),
}

/// Why a fetch was issued.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    /// Construction or `set_input`; never re-arms.
    Direct,
    /// A scheduler timer of the given generation.
    Scheduled { generation: u64 },
}

#[derive(Debug)]
struct Fetched {
    trigger: Trigger,
    result: Result<Value, FetchError>,
}

/// Owns all mutable monitor state and serializes every reaction to it.
///
/// Three sources feed the loop: handle commands, fetch completions and
/// scheduler wakeups. Each event is handled to completion before the next
/// one is taken.
pub(super) struct Reactor<H, K, S, C> {
    client: Arc<H>,
    endpoint: Url,
    input: Value,
    detector: ChangeDetector,
    cache: FallbackCache<S, C>,
    on_error: Option<ErrorCallback>,
    scheduler: TransportScheduler<K>,
    commands: UnboundedReceiver<Command>,
    wakeups: UnboundedReceiver<Wakeup>,
    fetched_tx: UnboundedSender<Fetched>,
    fetched_rx: UnboundedReceiver<Fetched>,
}

/// Everything a reactor is built from.
pub(super) struct Parts<H, K, S, C> {
    pub client: H,
    pub endpoint: Url,
    pub input: Value,
    pub detector: ChangeDetector,
    pub cache: FallbackCache<S, C>,
    pub on_error: Option<ErrorCallback>,
    pub scheduler: TransportScheduler<K>,
    pub commands: UnboundedReceiver<Command>,
    pub wakeups: UnboundedReceiver<Wakeup>,
}

impl<H, K, S, C> Reactor<H, K, S, C>
where
    H: HttpClient + 'static,
    K: Connector,
    S: KeyValueStore,
    C: Clock,
{
    pub(super) fn new(parts: Parts<H, K, S, C>) -> Self {
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(parts.client),
            endpoint: parts.endpoint,
            input: parts.input,
            detector: parts.detector,
            cache: parts.cache,
            on_error: parts.on_error,
            scheduler: parts.scheduler,
            commands: parts.commands,
            wakeups: parts.wakeups,
            fetched_tx,
            fetched_rx,
        }
    }

    /// Runs until the handle is dropped.
    ///
    /// Issues the initial fetch first. On exit the scheduler is stopped,
    /// which cancels any timer and closes any connection.
    pub(super) async fn run(mut self) {
        self.fetch(Trigger::Direct);

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.on_command(command);
                }

                Some(fetched) = self.fetched_rx.recv() => {
                    self.on_fetched(fetched);
                }

                Some(wakeup) = self.wakeups.recv() => {
                    self.on_wakeup(wakeup);
                }
            }
        }

        tracing::debug!("Monitor handle dropped, stopping");
        self.scheduler.stop();
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::SetInput(input) => {
                self.input = input;
                self.fetch(Trigger::Direct);
            }
            Command::Enter(mode) => {
                self.scheduler.enter(mode);
            }
            Command::Stop(kind) => {
                self.scheduler.stop_if(kind);
            }
        }
    }

    fn on_wakeup(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::TimerFired { generation } => {
                if self.scheduler.on_timer_fired(generation) {
                    self.fetch(Trigger::Scheduled { generation });
                }
            }
            Wakeup::Connection { generation, event } => {
                if let Some(reason) = self.scheduler.on_connection_event(generation, event) {
                    self.fall_back(&WatchError::Connection(reason));
                    self.scheduler.arm(Outcome::Failure);
                }
            }
        }
    }

    fn on_fetched(&mut self, fetched: Fetched) {
        let outcome = match fetched.result {
            Ok(output) => {
                self.cache.write(&output);
                self.detector.evaluate(output);
                Outcome::Success
            }
            Err(e) => {
                self.fall_back(&WatchError::Fetch(e));
                Outcome::Failure
            }
        };

        // A stop or start since the timer fired makes the result advisory only
        if let Trigger::Scheduled { generation } = fetched.trigger {
            if self.scheduler.generation().is_current(generation) {
                self.scheduler.arm(outcome);
            }
        }
    }

    /// Reports `error` and delivers the cached output if it is still valid.
    fn fall_back(&mut self, error: &WatchError) {
        match self.on_error.as_mut() {
            Some(on_error) => on_error(error),
            None => tracing::warn!("{error}"),
        }

        if let Some(cached) = self.cache.read_if_valid() {
            tracing::debug!("Using cached output");
            self.detector.evaluate(cached);
        }
    }

    fn fetch(&self, trigger: Trigger) {
        let client = Arc::clone(&self.client);
        let endpoint = self.endpoint.clone();
        let input = self.input.clone();
        let done = self.fetched_tx.clone();

        tokio::spawn(async move {
            let result = evaluate(client.as_ref(), &endpoint, &input).await;
            let _ = done.send(Fetched { trigger, result });
        });
    }
}
