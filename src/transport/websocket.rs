//! WebSocket implementation of [`Connector`].

use futures::stream::{self, BoxStream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::{ConnectionError, ConnectionEvent, Connector};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Progress of one connection through its event stream.
enum Phase {
    Connecting(Url),
    Open(Box<Socket>),
    Done,
}

/// Production connector speaking WebSocket (`ws://` and `wss://`).
///
/// Incoming frames are acknowledged only as [`ConnectionEvent::Message`];
/// pings are answered by tungstenite while the stream is being read.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a new connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    type Stream = BoxStream<'static, ConnectionEvent>;

    fn open(&self, url: &Url) -> Self::Stream {
        stream::unfold(Phase::Connecting(url.clone()), advance).boxed()
    }
}

async fn advance(phase: Phase) -> Option<(ConnectionEvent, Phase)> {
    match phase {
        Phase::Connecting(url) => match connect_async(url.as_str()).await {
            Ok((socket, _response)) => {
                tracing::debug!("Connected to {url}");
                Some((ConnectionEvent::Opened, Phase::Open(Box::new(socket))))
            }
            Err(e) => Some((
                ConnectionEvent::Closed(ConnectionError::Connect(Box::new(e))),
                Phase::Done,
            )),
        },
        Phase::Open(mut socket) => {
            let event = match socket.next().await {
                Some(Ok(Message::Close(frame))) => {
                    ConnectionEvent::Closed(ConnectionError::closed(describe_close(frame)))
                }
                Some(Ok(_)) => return Some((ConnectionEvent::Message, Phase::Open(socket))),
                Some(Err(e)) => ConnectionEvent::Closed(ConnectionError::Protocol(Box::new(e))),
                None => ConnectionEvent::Closed(ConnectionError::closed("stream ended")),
            };
            Some((event, Phase::Done))
        }
        Phase::Done => None,
    }
}

fn describe_close(frame: Option<CloseFrame>) -> String {
    frame.map_or_else(
        || "no close frame".to_string(),
        |f| {
            let reason: &str = &f.reason;
            if reason.is_empty() {
                format!("code {}", u16::from(f.code))
            } else {
                format!("code {}: {reason}", u16::from(f.code))
            }
        },
    )
}
