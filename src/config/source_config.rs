//! Per-source configuration sections.

use crate::domain::errors::ConfigError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROCESS_NAME: &str = "algod";
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// One remote endpoint polled with static headers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSourceConfig {
    pub endpoint: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Whole-request timeout. Unset means requests may hang indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HttpSourceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Build the static header map sent with every request.
    ///
    /// `index` is the position of this source in the config, for errors.
    pub fn header_map(&self, index: usize) -> Result<HeaderMap, ConfigError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let invalid = || ConfigError::InvalidHeader {
                index,
                name: name.clone(),
            };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    pub(crate) fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            index,
            endpoint: self.endpoint.clone(),
            reason,
        };
        let url = url::Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        self.header_map(index)?;
        Ok(())
    }
}

/// The local process watched by the system source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemSourceConfig {
    pub enabled: bool,
    pub process_name: String,
    pub proc_root: PathBuf,
}

impl Default for SystemSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
        }
    }
}
