//! Persistent connection trait.
//!
//! The monitoring mode keeps one long-lived connection open to the rules
//! service. Its payloads are never interpreted: the connection is only a
//! liveness and invalidation signal, and its closure is what triggers the
//! next evaluation.

use tokio_stream::Stream;
use url::Url;

use super::ConnectionError;

/// Lifecycle events of one persistent connection.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// The connection was established.
    Opened,
    /// A message arrived. Its content is ignored.
    Message,
    /// The connection is gone. Always the last event of a stream.
    Closed(ConnectionError),
}

impl ConnectionEvent {
    /// Returns true if no further events follow this one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// Opens persistent connections.
///
/// # Stream Semantics
///
/// Each call to [`Connector::open`] starts one connection attempt and
/// returns its event stream:
/// - `Opened` once the connection is up
/// - any number of `Message` events
/// - exactly one terminal `Closed`, after which the stream ends
///
/// Dropping the stream closes the connection. A stream that ends without
/// `Closed` is treated by the scheduler as a close without reason.
///
/// # Example
///
/// ```ignore
/// use ruller_watch::transport::{ConnectionEvent, Connector};
/// use tokio_stream::StreamExt;
///
/// async fn wait_for_close<K: Connector>(connector: &K, url: &url::Url) {
///     let mut events = connector.open(url);
///     while let Some(event) = events.next().await {
///         if let ConnectionEvent::Closed(reason) = event {
///             eprintln!("closed: {reason}");
///         }
///     }
/// }
/// ```
pub trait Connector: Send + 'static {
    /// The stream type returned by `open`.
    type Stream: Stream<Item = ConnectionEvent> + Send + Unpin + 'static;

    /// Starts connecting to `url`.
    fn open(&self, url: &Url) -> Self::Stream;
}
