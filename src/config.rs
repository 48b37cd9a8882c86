use std::env;
use std::fmt;
use std::fs;
use std::time::Duration;

use serde::Deserialize;

use crate::adapters::foxess::DEFAULT_BASE_URL;
use crate::domain::{interval, DeviceFilter, IntervalConfig, IntervalError};
use crate::error::ConfigError;

/// Names a TOML file providing base values; environment variables override it.
pub const CONFIG_PATH_VAR: &str = "FOXESS_CONFIG";

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub port: u16,
    pub inverters: Vec<String>,
    pub variables: Vec<String>,
    pub real_time_interval: Duration,
    pub status_interval: Duration,
    pub verbose: bool,
    pub log_level: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

/// Optional settings read from the config file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    port: Option<u16>,
    inverters: Option<Vec<String>>,
    variables: Option<Vec<String>>,
    real_time_interval: Option<String>,
    status_interval: Option<String>,
    verbose: Option<bool>,
    log_level: Option<String>,
    base_url: Option<String>,
    request_timeout: Option<String>,
}

impl FileConfig {
    fn read(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

impl Config {
    /// Load from the optional config file and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let file = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => FileConfig::read(&path)?,
            Err(_) => FileConfig::default(),
        };
        Self::from_sources(file, |name| env::var(name).ok())
    }

    /// Load from environment-style variables supplied by `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_sources(FileConfig::default(), lookup)
    }

    fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("FOXESS_API_KEY")
            .or(file.api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("FOXESS_API_KEY"))?;

        let port = match lookup("FOXESS_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "FOXESS_PORT",
                value,
            })?,
            None => file.port.unwrap_or(2112),
        };

        let verbose = match lookup("FOXESS_VERBOSE") {
            Some(value) => parse_bool("FOXESS_VERBOSE", value)?,
            None => file.verbose.unwrap_or(false),
        };

        Ok(Self {
            api_key,
            port,
            inverters: lookup("FOXESS_INVERTERS")
                .map(|s| parse_list(&s))
                .or(file.inverters)
                .unwrap_or_default(),
            variables: lookup("FOXESS_VARIABLES")
                .map(|s| parse_list(&s))
                .or(file.variables)
                .unwrap_or_default(),
            real_time_interval: parse_duration(
                "FOXESS_REAL_TIME_INTERVAL",
                lookup("FOXESS_REAL_TIME_INTERVAL").or(file.real_time_interval),
                "3m",
            )?,
            status_interval: parse_duration(
                "FOXESS_STATUS_INTERVAL",
                lookup("FOXESS_STATUS_INTERVAL").or(file.status_interval),
                "15m",
            )?,
            verbose,
            log_level: lookup("FOXESS_LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| "info".to_string()),
            base_url: lookup("FOXESS_BASE_URL")
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: parse_duration(
                "FOXESS_REQUEST_TIMEOUT",
                lookup("FOXESS_REQUEST_TIMEOUT").or(file.request_timeout),
                "30s",
            )?,
        })
    }

    /// Static device filter; empty when discovery should be used
    pub fn device_filter(&self) -> DeviceFilter {
        DeviceFilter::new(self.inverters.iter().cloned())
    }

    /// Clamped poll intervals and whether they fit the daily budget
    pub fn intervals(&self) -> (IntervalConfig, Result<(), IntervalError>) {
        interval::validate(self.real_time_interval, self.status_interval)
    }

    /// Crate log level; `verbose` raises it to debug
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let human = |d: Duration| humantime::format_duration(d).to_string();

        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("port", &self.port)
            .field("inverters", &self.inverters)
            .field("variables", &self.variables)
            .field("real_time_interval", &human(self.real_time_interval))
            .field("status_interval", &human(self.status_interval))
            .field("verbose", &self.verbose)
            .field("log_level", &self.log_level)
            .field("base_url", &self.base_url)
            .field("request_timeout", &human(self.request_timeout))
            .finish()
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_duration(
    name: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<Duration, ConfigError> {
    let value = value.unwrap_or_else(|| default.to_string());
    humantime::parse_duration(value.trim()).map_err(|source| ConfigError::InvalidDuration {
        name,
        value,
        source,
    })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}
