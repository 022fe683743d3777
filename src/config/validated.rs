//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::monitor::{ConfigurationError, MonitoringOptions, PollingOptions};
use crate::scheduler::Mode;

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::{MonitoringSection, PollingSection, TomlConfig};

/// How the monitor schedules its evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Evaluate on a fixed interval.
    Polling(PollingOptions),
    /// Evaluate whenever the persistent connection closes.
    Monitoring(MonitoringOptions),
}

impl Schedule {
    /// Resolves the options into a scheduler mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the options are invalid.
    pub fn to_mode(&self) -> Result<Mode, ConfigurationError> {
        match self {
            Self::Polling(options) => options.into_mode(),
            Self::Monitoring(options) => options.clone().into_mode(),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polling(options) => write!(f, "polling every {}ms", options.interval().as_millis()),
            Self::Monitoring(options) => write!(f, "monitoring {}", options.url()),
        }
    }
}

/// Fully validated configuration ready for use by the application.
///
/// This struct represents a complete, validated configuration where all
/// required fields are present and all values have been validated.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Decision endpoint (required)
    pub endpoint: Url,

    /// Input sent to the endpoint
    pub input: Value,

    /// Per-request timeout
    pub timeout: Option<Duration>,

    /// Fallback cache time-to-live; zero disables the cache
    pub cache_ttl: Duration,

    /// Directory for the on-disk cache.
    /// If `None`, the cache lives in memory.
    pub cache_dir: Option<PathBuf>,

    /// Evaluation schedule
    pub schedule: Schedule,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache_dir_str = self
            .cache_dir
            .as_ref()
            .map_or_else(|| "memory".to_string(), |p| p.display().to_string());
        let timeout_str = self
            .timeout
            .map_or_else(|| "none".to_string(), |t| format!("{}ms", t.as_millis()));

        write!(
            f,
            "Config {{ endpoint: {}, schedule: {}, timeout: {}, cache_ttl: {}ms, cache: {} }}",
            self.endpoint,
            self.schedule,
            timeout_str,
            self.cache_ttl.as_millis(),
            cache_dir_str,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint is missing or not a valid URL
    /// - The input is not valid JSON or its file cannot be read
    /// - The timeout is zero
    /// - Both polling and monitoring are configured
    /// - The schedule parameters are invalid
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let endpoint = Self::resolve_endpoint(cli, toml)?;
        let input = Self::resolve_input(cli, toml)?;
        let timeout = Self::resolve_timeout(cli, toml)?;

        // Priority: CLI explicit > TOML > default
        let cache_ttl = cli
            .cache_ttl
            .or_else(|| toml.and_then(|t| t.cache.ttl))
            .map_or_else(defaults::cache_ttl, Duration::from_millis);
        let cache_dir = cli
            .cache_dir
            .clone()
            .or_else(|| toml.and_then(|t| t.cache.dir.clone()));

        let schedule = Self::resolve_schedule(cli, toml)?;
        schedule.to_mode()?;

        Ok(Self {
            endpoint,
            input,
            timeout,
            cache_ttl,
            cache_dir,
            schedule,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_endpoint(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        // CLI takes precedence
        let url_str = cli
            .endpoint
            .as_deref()
            .or_else(|| toml.and_then(|t| t.endpoint.url.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(
                    field::ENDPOINT,
                    "Use --endpoint or set endpoint.url in config file",
                )
            })?;

        parse_url(url_str)
    }

    fn resolve_input(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Value, ConfigError> {
        if let Some(ref inline) = cli.input {
            return parse_json(inline, "--input");
        }
        if let Some(ref path) = cli.input_file {
            return read_json_file(path);
        }

        // Fall back to TOML
        if let Some(toml) = toml {
            if let Some(ref input) = toml.endpoint.input {
                return Ok(input.clone());
            }
            if let Some(ref path) = toml.endpoint.input_file {
                return read_json_file(path);
            }
        }

        Ok(Value::Null)
    }

    fn resolve_timeout(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Option<Duration>, ConfigError> {
        let Some(millis) = cli
            .timeout
            .or_else(|| toml.and_then(|t| t.endpoint.timeout))
        else {
            return Ok(None);
        };

        if millis == 0 {
            return Err(ConfigError::InvalidDuration {
                field: "timeout",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Some(Duration::from_millis(millis)))
    }

    fn resolve_schedule(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Schedule, ConfigError> {
        let polling = toml.and_then(|t| t.polling.as_ref());
        let monitoring = toml.and_then(|t| t.monitoring.as_ref());

        // A mode chosen on the command line replaces the one in the file
        let use_monitoring = if cli.monitor_url.is_some() {
            true
        } else if cli.poll_interval.is_some() {
            false
        } else {
            match (polling, monitoring) {
                (Some(_), Some(_)) => return Err(ConfigError::ConflictingModes),
                (None, Some(_)) => true,
                _ => false,
            }
        };

        if use_monitoring {
            Self::monitoring_schedule(cli, monitoring)
        } else {
            Ok(Self::polling_schedule(cli, polling))
        }
    }

    fn polling_schedule(cli: &Cli, section: Option<&PollingSection>) -> Schedule {
        let interval = cli
            .poll_interval
            .or_else(|| section.and_then(|s| s.interval))
            .map_or_else(defaults::poll_interval, Duration::from_millis);

        let mut options = PollingOptions::new(interval);
        if let Some(millis) = cli.jitter_max.or_else(|| section.and_then(|s| s.jitter_max)) {
            options = options.with_jitter_max(Duration::from_millis(millis));
        }
        if let Some(millis) = cli.max_retry.or_else(|| section.and_then(|s| s.max_retry)) {
            options = options.with_max_retry(Duration::from_millis(millis));
        }

        Schedule::Polling(options)
    }

    fn monitoring_schedule(
        cli: &Cli,
        section: Option<&MonitoringSection>,
    ) -> Result<Schedule, ConfigError> {
        let url = cli
            .monitor_url
            .as_deref()
            .or_else(|| section.and_then(|s| s.url.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(
                    field::MONITOR_URL,
                    "Use --monitor-url or set monitoring.url in config file",
                )
            })?;

        let mut options = MonitoringOptions::new(url);
        if let Some(millis) = cli.backoff_min.or_else(|| section.and_then(|s| s.backoff_min)) {
            options = options.with_backoff_min(Duration::from_millis(millis));
        }
        if let Some(millis) = cli.jitter_max.or_else(|| section.and_then(|s| s.jitter_max)) {
            options = options.with_jitter_max(Duration::from_millis(millis));
        }
        if let Some(millis) = cli.max_retry.or_else(|| section.and_then(|s| s.max_retry)) {
            options = options.with_max_retry(Duration::from_millis(millis));
        }

        Ok(Schedule::Monitoring(options))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn parse_url(s: &str) -> Result<Url, ConfigError> {
    Url::parse(s).map_err(|e| ConfigError::InvalidUrl {
        url: s.to_string(),
        reason: e.to_string(),
    })
}

fn parse_json(s: &str, origin: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(s).map_err(|e| ConfigError::InvalidInput {
        origin: origin.to_string(),
        source: e,
    })
}

fn read_json_file(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_json(&content, &path.display().to_string())
}
