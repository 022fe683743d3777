//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ruller-watch: change notifications for a remote rules endpoint
///
/// Evaluates a decision endpoint with a JSON input and prints the output
/// as one JSON line each time it changes.
#[derive(Debug, Parser)]
#[command(name = "ruller-watch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Decision endpoint URL (required for run mode)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Input sent to the endpoint, as inline JSON
    #[arg(long, value_name = "JSON", conflicts_with = "input_file")]
    pub input: Option<String>,

    /// Read the input from a JSON file
    #[arg(long = "input-file", value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// How long a cached output stays usable, in milliseconds (0 disables)
    #[arg(long = "cache-ttl", value_name = "MS")]
    pub cache_ttl: Option<u64>,

    /// Directory holding the fallback cache across restarts
    #[arg(long = "cache-dir", value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Poll the endpoint every N milliseconds
    #[arg(long = "poll-interval", value_name = "MS", conflicts_with = "monitor_url")]
    pub poll_interval: Option<u64>,

    /// Re-evaluate whenever the persistent connection at this URL closes
    #[arg(long = "monitor-url", value_name = "URL")]
    pub monitor_url: Option<String>,

    /// Base retry delay in milliseconds (monitoring only)
    #[arg(long = "backoff-min", value_name = "MS")]
    pub backoff_min: Option<u64>,

    /// Upper bound of the randomized first retry, in milliseconds
    #[arg(long = "jitter-max", value_name = "MS")]
    pub jitter_max: Option<u64>,

    /// Ceiling for later retries, in milliseconds
    #[arg(long = "max-retry", value_name = "MS")]
    pub max_retry: Option<u64>,

    /// Path to configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,
}

/// Subcommands for ruller-watch
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "ruller-watch.toml")]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}
