use thiserror::Error;

use crate::domain::IntervalError;

/// Failures talking to the FoxESS Open API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to perform {method} request to {path}: {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} request to {path} returned HTTP {status}")]
    Status {
        method: String,
        path: String,
        status: u16,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("error response from foxess: {errno} - {message}")]
    Upstream { errno: i64, message: String },

    #[error("response from {path} is missing its result")]
    MissingResult { path: String },

    #[error("failed to parse '{value}' as a timestamp: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A poll tick that did not complete; contained within its task
#[derive(Debug, Error)]
pub enum PollError {
    #[error("failed to update API usage: {0}")]
    Quota(#[source] ApiError),

    #[error("unable to update device list: {0}")]
    DeviceStatus(#[source] ApiError),

    #[error("unable to retrieve latest real-time data: {0}")]
    RealTime(#[source] ApiError),
}

/// Invalid or incomplete startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid duration for {name} ('{value}'): {source}")]
    InvalidDuration {
        name: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Interval(#[from] IntervalError),
}
