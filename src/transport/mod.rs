//! Transport collaborators of the monitor.
//!
//! This module provides:
//! - HTTP request/response value types ([`HttpRequest`], [`HttpResponse`])
//! - The HTTP client abstraction ([`HttpClient`]) and its reqwest
//!   implementation ([`ReqwestClient`])
//! - Evaluation of the decision endpoint ([`evaluate`])
//! - Persistent invalidation connections ([`Connector`], [`ConnectionEvent`])
//!   and their WebSocket implementation ([`WebSocketConnector`])
//! - Error types ([`HttpError`], [`FetchError`], [`ConnectionError`])

mod client;
mod connection;
mod error;
mod exchange;
mod http;
mod websocket;


pub use client::ReqwestClient;
pub use connection::{ConnectionEvent, Connector};
pub use error::{ConnectionError, FetchError, HttpError};
pub use exchange::{build_request, decode_response, evaluate};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use websocket::WebSocketConnector;
