//! Tests for validated configuration.

use std::time::Duration;

use serde_json::json;

use super::ConfigError;
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::{Schedule, ValidatedConfig};
use crate::monitor::{MonitoringOptions, PollingOptions};

/// Helper to create CLI args from a slice
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["ruller-watch"];
    full_args.extend(args);
    Cli::parse_from_iter(full_args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

const ENDPOINT: &str = "https://rules.example.com/evaluate";
