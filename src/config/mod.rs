//! Configuration layer for ruller-watch.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`], [`Schedule`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! The input follows the same order: `--input`, then `--input-file`, then
//! `endpoint.input`, then `endpoint.input_file`, then `null`.
//!
//! # Mode Selection
//!
//! `--poll-interval` or `--monitor-url` on the command line selects the mode
//! regardless of the config file. Otherwise the `[polling]` or `[monitoring]`
//! section decides; having both is an error. With neither, the monitor polls
//! every 60 seconds.
//!
//! `--jitter-max` and `--max-retry` apply to whichever mode is selected.
//! `--backoff-min` only affects monitoring.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use toml::{
    CacheSection, EndpointSection, MonitoringSection, PollingSection, TomlConfig,
    default_config_template,
};
pub use validated::{Schedule, ValidatedConfig, write_default_config};
