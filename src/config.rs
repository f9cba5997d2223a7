//! Scraper configuration.
//!
//! All fields are declarative. Missing sections are filled with defaults when
//! deserializing, so a configuration file only needs to mention what it
//! changes. Only the absence of `root_path` has a side effect: the container
//! probe run by the factory.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the values of a [`MatchConfig`] are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Exact string equality.
    #[default]
    Strict,
    /// Unanchored regular expression match.
    Regexp,
}

/// A list of values to match a mount attribute against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    pub values: Vec<String>,
    #[serde(default)]
    pub match_type: MatchType,
}

impl MatchConfig {
    pub fn strict<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            match_type: MatchType::Strict,
        }
    }

    pub fn regexp<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            match_type: MatchType::Regexp,
        }
    }
}

/// Toggle for a single emitted metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricConfig {
    pub enabled: bool,
}

impl MetricConfig {
    const fn on() -> Self {
        Self { enabled: true }
    }

    const fn off() -> Self {
        Self { enabled: false }
    }
}

fn metric_on() -> MetricConfig {
    MetricConfig::on()
}

fn metric_off() -> MetricConfig {
    MetricConfig::off()
}

/// Emission toggles, keyed by metric name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(rename = "system.filesystem.usage", default = "metric_on")]
    pub usage: MetricConfig,
    #[serde(rename = "system.filesystem.inodes.usage", default = "metric_on")]
    pub inodes_usage: MetricConfig,
    #[serde(rename = "system.filesystem.utilization", default = "metric_off")]
    pub utilization: MetricConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            usage: MetricConfig::on(),
            inodes_usage: MetricConfig::on(),
            utilization: MetricConfig::off(),
        }
    }
}

/// Filesystem scraper configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root under which the host filesystem is mounted. Empty means the
    /// scraper runs directly on the host.
    #[serde(default)]
    pub root_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_devices: Option<MatchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_devices: Option<MatchConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_fs_types: Option<MatchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_fs_types: Option<MatchConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_mount_points: Option<MatchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_mount_points: Option<MatchConfig>,

    /// Report filesystems not backed by a block device (`tmpfs`, `proc`, ...).
    #[serde(default)]
    pub include_virtual_filesystems: bool,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Error loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Parse(e) => write!(f, "invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl Config {
    /// Parses a configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Returns `true` if an explicit root path was configured.
    pub fn has_root_path(&self) -> bool {
        !self.root_path.is_empty()
    }
}
