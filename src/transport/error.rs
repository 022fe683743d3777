//! Error types for the transport collaborators.

use thiserror::Error;

/// Error type for a single HTTP exchange.
///
/// Describes what went wrong on the wire without dictating recovery.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed.
    ///
    /// Includes DNS resolution failures, refused connections and
    /// failures while reading the response body.
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The client-side timeout elapsed before a response arrived.
    #[error("Request timed out")]
    Timeout,

    /// The request could not be built for the given URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Failure of one evaluation of the decision endpoint.
///
/// Always recoverable: the monitor reports it, consults the fallback
/// cache and lets the scheduler retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The endpoint answered with something other than `200 OK`.
    #[error("Endpoint returned status {status}")]
    Status {
        /// The status code received
        status: http::StatusCode,
        /// Response body, when it was valid UTF-8
        body: Option<String>,
    },

    /// The exchange itself failed.
    #[error("Request failed: {0}")]
    Transport(#[from] HttpError),

    /// The input could not be encoded as a JSON request body.
    #[error("Failed to encode input: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body was not valid JSON.
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Failure or termination of the persistent invalidation connection.
///
/// Every variant means the connection is gone; the scheduler treats
/// them all as a failed attempt and backs off before reconnecting.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection could not be established.
    #[error("Failed to connect: {0}")]
    Connect(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The connection broke while open.
    #[error("Connection error: {0}")]
    Protocol(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The peer closed the connection.
    #[error("Connection closed: {reason}")]
    Closed {
        /// Close code and reason as reported by the peer
        reason: String,
    },
}

impl ConnectionError {
    /// Creates a `Closed` error with the given reason.
    #[must_use]
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::Closed {
            reason: reason.into(),
        }
    }
}
