//! Application execution logic.
//!
//! This module wires the validated configuration into a [`Monitor`],
//! prints every changed output as a JSON line on stdout and keeps the
//! monitor alive until a shutdown signal arrives.

use std::io;

use thiserror::Error;
use tokio::signal;

use ruller_watch::cache::{FileStore, KeyValueStore, MemoryStore};
use ruller_watch::config::{Schedule, ValidatedConfig};
use ruller_watch::monitor::{ConfigurationError, ConstructionError, Monitor, WatchError};
use ruller_watch::transport::ReqwestClient;

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The monitor could not be constructed.
    #[error("Failed to create monitor: {0}")]
    Build(#[from] ConstructionError),

    /// The schedule was rejected by the monitor.
    #[error("Failed to start schedule: {0}")]
    Schedule(#[from] ConfigurationError),

    /// Failed to listen for shutdown signals.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] io::Error),
}

/// Executes the main application loop.
///
/// This function:
/// 1. Creates the HTTP client and the cache store
/// 2. Builds the monitor, which evaluates the endpoint once right away
/// 3. Starts polling or monitoring as configured
/// 4. Waits for a shutdown signal (Ctrl+C or SIGTERM)
///
/// # Errors
///
/// Returns an error if the monitor cannot be built, the schedule is
/// rejected, or the signal handlers cannot be installed.
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires real
/// network access and signal handling.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let client = create_client(&config);

    if let Some(ref dir) = config.cache_dir {
        tracing::info!("Cache persistence enabled: {}", dir.display());
        let store = FileStore::new(dir);
        run_with_store(config, client, store).await
    } else {
        run_with_store(config, client, MemoryStore::new()).await
    }
}

/// Creates the HTTP client from configuration.
fn create_client(config: &ValidatedConfig) -> ReqwestClient {
    let client = ReqwestClient::new();
    match config.timeout {
        Some(timeout) => client.with_timeout(timeout),
        None => client,
    }
}

#[cfg(not(tarpaulin_include))]
async fn run_with_store<S>(
    config: ValidatedConfig,
    client: ReqwestClient,
    store: S,
) -> Result<(), RunError>
where
    S: KeyValueStore + 'static,
{
    let monitor = Monitor::builder()
        .endpoint(config.endpoint.as_str())
        .input(config.input)
        .cache_ttl(config.cache_ttl)
        .on_change(|output| println!("{output}"))
        .on_error(report_error)
        .with_client(client)
        .with_store(store)
        .build()?;

    start_schedule(&monitor, config.schedule)?;

    shutdown_signal().await.map_err(RunError::Signal)?;
    tracing::info!("Shutdown signal received, stopping...");

    // Dropping the handle cancels timers and closes the connection
    drop(monitor);
    Ok(())
}

/// Puts the monitor into the configured mode.
fn start_schedule(monitor: &Monitor, schedule: Schedule) -> Result<(), ConfigurationError> {
    match schedule {
        Schedule::Polling(options) => {
            tracing::info!(
                "Polling mode enabled (interval: {}ms)",
                options.interval().as_millis()
            );
            monitor.start_polling(options)
        }
        Schedule::Monitoring(options) => {
            tracing::info!("Monitoring mode enabled ({})", options.url());
            monitor.start_monitoring(options)
        }
    }
}

fn report_error(error: &WatchError) {
    tracing::warn!("{error}");
}

/// Returns when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await
    }
}
