//! ruller-watch: change notifications for a remote rules endpoint
//!
//! A library that evaluates a decision endpoint with a JSON input and
//! notifies the caller only when the output changes, either by polling or
//! by watching a persistent connection, with a time-bounded fallback cache
//! for when the endpoint is unreachable.

pub mod cache;
pub mod config;
pub mod monitor;
pub mod scheduler;
pub mod time;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_fixtures;
