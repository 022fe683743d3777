//! Shared test fixtures for scheduler and monitor tests.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use url::Url;

use crate::scheduler::Jitter;
use crate::time::Clock;
use crate::transport::{
    ConnectionError, ConnectionEvent, Connector, HttpClient, HttpError, HttpRequest, HttpResponse,
};

/// One scripted endpoint reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `200 OK` with this JSON body
    Json(Value),
    /// Any status with an empty body
    Status(u16),
    /// Transport-level timeout
    Timeout,
}

impl Reply {
    fn into_result(self) -> Result<HttpResponse, HttpError> {
        match self {
            Self::Json(value) => Ok(HttpResponse::ok(value.to_string())),
            Self::Status(code) => Ok(HttpResponse::new(
                http::StatusCode::from_u16(code).unwrap(),
                http::HeaderMap::new(),
                Vec::new(),
            )),
            Self::Timeout => Err(HttpError::Timeout),
        }
    }
}

/// Mock HTTP client replaying a script of replies.
///
/// The last reply repeats once the script is exhausted. Request bodies
/// are captured as JSON.
#[derive(Debug)]
pub struct MockClient {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    bodies: Mutex<Vec<Value>>,
    calls: AtomicUsize,
}

impl MockClient {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            bodies: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(value: Value) -> Self {
        Self::new(vec![Reply::Json(value)])
    }

    /// Appends replies to the script.
    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            *last = Some(reply);
        }
        last.clone().unwrap_or(Reply::Status(503))
    }
}

impl HttpClient for MockClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(body) = &req.body {
            self.bodies
                .lock()
                .unwrap()
                .push(serde_json::from_slice(body).unwrap());
        }
        self.next_reply().into_result()
    }
}

impl HttpClient for Arc<MockClient> {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.as_ref().request(req).await
    }
}

/// Mock client whose replies arrive `delay` after the request is counted.
#[derive(Debug, Clone)]
pub struct DelayedClient {
    inner: Arc<MockClient>,
    delay: Duration,
}

impl DelayedClient {
    pub const fn new(inner: Arc<MockClient>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl HttpClient for DelayedClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let result = self.inner.request(req).await;
        tokio::time::sleep(self.delay).await;
        result
    }
}

#[derive(Debug, Default)]
struct ConnectorState {
    urls: Mutex<Vec<Url>>,
    senders: Mutex<Vec<Option<UnboundedSender<ConnectionEvent>>>>,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// Mock connector whose connections are driven by the test.
///
/// Clones share state, so the test keeps a clone after handing one to the
/// code under test.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<ConnectorState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections opened so far.
    pub fn opened(&self) -> usize {
        self.state.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<Url> {
        self.state.urls.lock().unwrap().clone()
    }

    /// Connection streams not yet dropped.
    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live streams.
    pub fn max_live(&self) -> usize {
        self.state.max_live.load(Ordering::SeqCst)
    }

    /// Sends `event` on the most recently opened connection.
    pub fn emit(&self, event: ConnectionEvent) {
        let senders = self.state.senders.lock().unwrap();
        let sender = senders
            .last()
            .and_then(Option::as_ref)
            .expect("no open mock connection");
        sender.send(event).expect("mock connection stream dropped");
    }

    /// Closes the most recent connection with `reason`.
    pub fn close(&self, reason: &str) {
        self.emit(ConnectionEvent::Closed(ConnectionError::closed(reason)));
    }

    /// Ends the most recent connection's stream without a close event.
    pub fn hang_up(&self) {
        if let Some(sender) = self.state.senders.lock().unwrap().last_mut() {
            sender.take();
        }
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn open(&self, url: &Url) -> Self::Stream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.urls.lock().unwrap().push(url.clone());
        self.state.senders.lock().unwrap().push(Some(tx));
        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live.fetch_max(live, Ordering::SeqCst);
        MockStream {
            events: UnboundedReceiverStream::new(rx),
            state: Arc::clone(&self.state),
        }
    }
}

/// Event stream of one mock connection. Tracks liveness on drop.
#[derive(Debug)]
pub struct MockStream {
    events: UnboundedReceiverStream<ConnectionEvent>,
    state: Arc<ConnectorState>,
}

impl Stream for MockStream {
    type Item = ConnectionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Jitter that always picks the same delay.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl Jitter for FixedJitter {
    fn pick(&mut self, _min: Duration, _max: Duration) -> Duration {
        self.0
    }
}

/// Millisecond clock shared with the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    millis: Arc<AtomicU64>,
}

impl MockClock {
    pub fn at(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Lets spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
