//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

use crate::monitor::ConfigurationError;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file or the input file.
    #[error("Failed to read file '{}': {source}", path.display())]
    FileRead {
        /// Path of the file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write configuration file (for init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Missing required field that must be provided by CLI or config file.
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired {
        /// Name of the missing field
        field: &'static str,
        /// Hint for how to provide the value
        hint: &'static str,
    },

    /// Invalid URL provided.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The invalid URL string
        url: String,
        /// Reason for invalidity
        reason: String,
    },

    /// The input is not valid JSON.
    #[error("Invalid input from {origin}: {source}")]
    InvalidInput {
        /// Where the input came from
        origin: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Invalid duration value.
    #[error("Invalid duration for {field}: {reason}")]
    InvalidDuration {
        /// Name of the field
        field: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Both polling and monitoring were configured.
    #[error("Polling and monitoring are mutually exclusive; configure only one")]
    ConflictingModes,

    /// The schedule parameters were rejected.
    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ConfigurationError),
}

/// Well-known field names for `MissingRequired` errors.
///
/// Use these constants for compile-time safety when matching field names.
pub mod field {
    /// The endpoint URL field.
    pub const ENDPOINT: &str = "endpoint";
    /// The monitoring URL field.
    pub const MONITOR_URL: &str = "monitoring.url";
}

impl ConfigError {
    /// Creates a `MissingRequired` error for a required field.
    #[must_use]
    pub const fn missing(field: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { field, hint }
    }
}
