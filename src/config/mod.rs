//! Agent configuration.
//!
//! The configuration is a TOML document read once at startup. A few fields
//! can be overridden from the environment (a `.env` file is honoured by the
//! binary). Validation happens here, before anything is built.

mod source_config;

pub use source_config::{
    DEFAULT_PROC_ROOT, DEFAULT_PROCESS_NAME, HttpSourceConfig, SystemSourceConfig,
};

use crate::domain::errors::ConfigError;
use crate::infrastructure::observability::reporter::DEFAULT_QUEUE_CAPACITY;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_SAMPLE_FREQUENCY: &str = "METRICS_AGENT_SAMPLE_FREQUENCY";
pub const ENV_OUTPUT_FILE: &str = "METRICS_AGENT_OUTPUT_FILE";
pub const ENV_PROCESS_NAME: &str = "METRICS_AGENT_PROCESS_NAME";

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Main agent configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub http_sources: Vec<HttpSourceConfig>,
    /// Sampling interval in seconds.
    #[serde(default)]
    pub sample_frequency: u64,
    #[serde(default)]
    pub target_output_file: PathBuf,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub system: SystemSourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_sources: Vec::new(),
            sample_frequency: 0,
            target_output_file: PathBuf::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            system: SystemSourceConfig::default(),
        }
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl Config {
    /// Read `path`, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = content.parse().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SAMPLE_FREQUENCY) {
            self.sample_frequency =
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        key: ENV_SAMPLE_FREQUENCY.to_string(),
                        value: value.clone(),
                    })?;
        }
        if let Some(value) = lookup(ENV_OUTPUT_FILE) {
            self.target_output_file = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_PROCESS_NAME) {
            self.system.process_name = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_frequency < 1 {
            return Err(ConfigError::InvalidSampleFrequency(self.sample_frequency));
        }
        if self.target_output_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputTarget);
        }
        if self.queue_capacity < 1 {
            return Err(ConfigError::InvalidQueueCapacity);
        }
        if self.system.enabled && self.system.process_name.trim().is_empty() {
            return Err(ConfigError::EmptyProcessName);
        }
        for (index, source) in self.http_sources.iter().enumerate() {
            source.validate(index)?;
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_frequency)
    }
}
