//! Construction of a [`Monitor`].

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use super::reactor::{Parts, Reactor};
use super::{ChangeCallback, ChangeDetector, ConstructionError, ErrorCallback, Monitor, WatchError};
use crate::cache::{FallbackCache, KeyValueStore, MemoryStore};
use crate::scheduler::{Generation, Jitter, ModeKind, RandomJitter, TransportScheduler};
use crate::time::{Clock, SystemClock};
use crate::transport::{Connector, HttpClient, ReqwestClient, WebSocketConnector};

/// Builder for [`Monitor`].
///
/// The endpoint and the change callback are required. The collaborators
/// default to the production implementations and can each be replaced:
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `H` HTTP client | [`ReqwestClient`] |
/// | `K` connector | [`WebSocketConnector`] |
/// | `S` cache store | [`MemoryStore`] |
/// | `C` clock | [`SystemClock`] |
///
/// # Example
///
/// ```no_run
/// use ruller_watch::monitor::{Monitor, PollingOptions};
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let monitor = Monitor::builder()
///     .endpoint("https://rules.example.com/evaluate")
///     .input(json!({"user": "alice"}))
///     .cache_ttl(Duration::from_secs(30))
///     .on_change(|output| println!("{output}"))
///     .build()?;
///
/// monitor.start_polling(PollingOptions::new(Duration::from_secs(10)))?;
/// # Ok(())
/// # }
/// ```
pub struct MonitorBuilder<
    H = ReqwestClient,
    K = WebSocketConnector,
    S = MemoryStore,
    C = SystemClock,
> {
    endpoint: Option<String>,
    input: Value,
    cache_ttl: Duration,
    on_change: Option<ChangeCallback>,
    on_error: Option<ErrorCallback>,
    client: H,
    connector: K,
    store: S,
    clock: C,
    jitter: Box<dyn Jitter>,
}

impl MonitorBuilder {
    /// Creates a builder with production collaborators, a `null` input and
    /// the cache disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: None,
            input: Value::Null,
            cache_ttl: Duration::ZERO,
            on_change: None,
            on_error: None,
            client: ReqwestClient::new(),
            connector: WebSocketConnector::new(),
            store: MemoryStore::new(),
            clock: SystemClock,
            jitter: Box::new(RandomJitter),
        }
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, K, S, C> MonitorBuilder<H, K, S, C> {
    /// Sets the decision endpoint URL.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the initial input.
    #[must_use]
    pub fn input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Sets how long a cached output stays usable. Zero disables the cache.
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the callback receiving each changed output.
    #[must_use]
    pub fn on_change(mut self, on_change: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(on_change));
        self
    }

    /// Sets the callback receiving recoverable failures.
    ///
    /// Without one, failures are logged as warnings.
    #[must_use]
    pub fn on_error(mut self, on_error: impl FnMut(&WatchError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Replaces the source of first-retry jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.jitter = Box::new(jitter);
        self
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_client<H2>(self, client: H2) -> MonitorBuilder<H2, K, S, C> {
        MonitorBuilder {
            endpoint: self.endpoint,
            input: self.input,
            cache_ttl: self.cache_ttl,
            on_change: self.on_change,
            on_error: self.on_error,
            client,
            connector: self.connector,
            store: self.store,
            clock: self.clock,
            jitter: self.jitter,
        }
    }

    /// Replaces the persistent connection factory.
    #[must_use]
    pub fn with_connector<K2>(self, connector: K2) -> MonitorBuilder<H, K2, S, C> {
        MonitorBuilder {
            endpoint: self.endpoint,
            input: self.input,
            cache_ttl: self.cache_ttl,
            on_change: self.on_change,
            on_error: self.on_error,
            client: self.client,
            connector,
            store: self.store,
            clock: self.clock,
            jitter: self.jitter,
        }
    }

    /// Replaces the cache store.
    #[must_use]
    pub fn with_store<S2>(self, store: S2) -> MonitorBuilder<H, K, S2, C> {
        MonitorBuilder {
            endpoint: self.endpoint,
            input: self.input,
            cache_ttl: self.cache_ttl,
            on_change: self.on_change,
            on_error: self.on_error,
            client: self.client,
            connector: self.connector,
            store,
            clock: self.clock,
            jitter: self.jitter,
        }
    }

    /// Replaces the clock used to stamp and age cache entries.
    #[must_use]
    pub fn with_clock<C2>(self, clock: C2) -> MonitorBuilder<H, K, S, C2> {
        MonitorBuilder {
            endpoint: self.endpoint,
            input: self.input,
            cache_ttl: self.cache_ttl,
            on_change: self.on_change,
            on_error: self.on_error,
            client: self.client,
            connector: self.connector,
            store: self.store,
            clock,
            jitter: self.jitter,
        }
    }
}

impl<H, K, S, C> MonitorBuilder<H, K, S, C>
where
    H: HttpClient + 'static,
    K: Connector,
    S: KeyValueStore + 'static,
    C: Clock + 'static,
{
    /// Validates the parameters, spawns the monitor task and issues the
    /// initial fetch.
    ///
    /// With a zero cache TTL any entry left in the store is removed.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError`] if the endpoint or change callback is
    /// missing, the endpoint is not a valid URL, or no Tokio runtime is
    /// running.
    pub fn build(self) -> Result<Monitor, ConstructionError> {
        let raw = self.endpoint.ok_or(ConstructionError::MissingEndpoint)?;
        let endpoint = Url::parse(&raw)
            .map_err(|source| ConstructionError::InvalidEndpoint { url: raw, source })?;
        let on_change = self
            .on_change
            .ok_or(ConstructionError::MissingChangeCallback)?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(ConstructionError::NoRuntime)?;

        let cache = FallbackCache::with_clock(self.store, self.clock, self.cache_ttl);
        if !cache.is_enabled() {
            cache.clear();
        }

        let generation = Generation::new();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (wakeups_tx, wakeups_rx) = mpsc::unbounded_channel();
        let scheduler = TransportScheduler::new(self.connector, generation.clone(), wakeups_tx)
            .with_jitter(self.jitter);

        let reactor = Reactor::new(Parts {
            client: self.client,
            endpoint,
            input: self.input,
            detector: ChangeDetector::new(on_change),
            cache,
            on_error: self.on_error,
            scheduler,
            commands: commands_rx,
            wakeups: wakeups_rx,
        });
        runtime.spawn(reactor.run());

        Ok(Monitor {
            commands: commands_tx,
            generation,
            mode: Mutex::new(ModeKind::Idle),
        })
    }
}
