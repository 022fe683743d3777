//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Decision endpoint section
    #[serde(default)]
    pub endpoint: EndpointSection,

    /// Fallback cache section
    #[serde(default)]
    pub cache: CacheSection,

    /// Polling mode section
    pub polling: Option<PollingSection>,

    /// Monitoring mode section
    pub monitoring: Option<MonitoringSection>,
}

/// Decision endpoint section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSection {
    /// Endpoint URL
    pub url: Option<String>,

    /// Input, written as a TOML value
    pub input: Option<serde_json::Value>,

    /// Path to a JSON file holding the input
    pub input_file: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    pub timeout: Option<u64>,
}

/// Fallback cache section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Time-to-live in milliseconds (0 disables the cache)
    pub ttl: Option<u64>,

    /// Directory holding the cache file
    pub dir: Option<PathBuf>,
}

/// Polling mode section. Its presence selects polling.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingSection {
    /// Interval in milliseconds
    pub interval: Option<u64>,

    /// Upper bound of the randomized first retry, in milliseconds
    pub jitter_max: Option<u64>,

    /// Ceiling for later retries, in milliseconds
    pub max_retry: Option<u64>,
}

/// Monitoring mode section. Its presence selects monitoring.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringSection {
    /// Persistent connection URL
    pub url: Option<String>,

    /// Base retry delay in milliseconds
    pub backoff_min: Option<u64>,

    /// Upper bound of the randomized first retry, in milliseconds
    pub jitter_max: Option<u64>,

    /// Ceiling for later retries, in milliseconds
    pub max_retry: Option<u64>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# ruller-watch Configuration File

[endpoint]
# Decision endpoint URL (required)
# url = "https://rules.example.com/evaluate"

# Input sent as the JSON request body (default: null)
# input = { user = "alice", plan = "pro" }

# Or read the input from a JSON file
# input_file = "input.json"

# Per-request timeout in milliseconds (default: none)
# timeout = 10000

[cache]
# How long the last output stays usable when the endpoint is down,
# in milliseconds (default: 0, cache disabled)
# ttl = 30000

# Keep the cache on disk across restarts (default: in memory)
# dir = "/var/cache/ruller-watch"

# Pick one of [polling] or [monitoring].

[polling]
# Interval in milliseconds, at least 1000 (default: 60000)
interval = 60000

# Randomized first retry ceiling (default: 3 x interval)
# jitter_max = 180000

# Ceiling for later retries (default: 6 x interval)
# max_retry = 360000

# [monitoring]
# Re-evaluate each time this connection closes
# url = "wss://rules.example.com/live"

# Base retry delay (default: 2000)
# backoff_min = 2000

# Randomized first retry ceiling (default: 12000)
# jitter_max = 12000

# Ceiling for later retries (default: 30000)
# max_retry = 30000
"#
    .to_string()
}
