use std::path::PathBuf;
use thiserror::Error;

/// A `/proc` file whose content did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("parse error in {file}: {message}")]
pub struct ParseError {
    pub file: &'static str,
    pub message: String,
}

impl ParseError {
    pub fn new(file: &'static str, msg: impl Into<String>) -> Self {
        Self {
            file,
            message: msg.into(),
        }
    }
}

/// Errors raised while loading or validating the agent configuration.
///
/// All of these are fatal: they are surfaced before the agent exists.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("empty config")]
    Missing,

    #[error("invalid sample frequency: {0} (must be >= 1 second)")]
    InvalidSampleFrequency(u64),

    #[error("target output file not specified")]
    EmptyOutputTarget,

    #[error("http source #{index} has an invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        index: usize,
        endpoint: String,
        reason: String,
    },

    #[error("http source #{index} has an invalid header {name:?}")]
    InvalidHeader { index: usize, name: String },

    #[error("queue capacity must be at least 1")]
    InvalidQueueCapacity,

    #[error("system source process name is empty")]
    EmptyProcessName,

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

/// Errors from a single collection cycle of one source.
///
/// These never stop the agent; the sample for that cycle is dropped.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("unable to find pid for process {name:?}")]
    ProcessNotFound { name: String },

    #[error("invalid pid {raw:?}")]
    InvalidPid { raw: String },

    #[error("failed to read {path:?}: {source}")]
    Procfs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to update instrument: {0}")]
    Instrument(#[from] prometheus::Error),
}

/// Errors raised while assembling an agent from its configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open output sink {path:?}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to register instrument: {0}")]
    Instrument(#[from] prometheus::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
