use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operational state reported for an inverter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Online,
    Fault,
    Offline,
    Unknown(i64),
}

impl DeviceStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Online,
            2 => Self::Fault,
            3 => Self::Offline,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Online => 1,
            Self::Fault => 2,
            Self::Offline => 3,
            Self::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "Online"),
            Self::Fault => write!(f, "Fault"),
            Self::Offline => write!(f, "Offline"),
            Self::Unknown(code) => write!(f, "Unknown:{}", code),
        }
    }
}

/// An inverter as returned by the device listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub serial_number: String,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
}

impl Device {
    pub fn new(serial_number: impl Into<String>, status: DeviceStatus) -> Self {
        Self {
            serial_number: serial_number.into(),
            status,
            station_name: None,
        }
    }

    pub fn with_station_name(mut self, station_name: Option<String>) -> Self {
        self.station_name = station_name;
        self
    }
}

/// Operator-supplied set of inverter serial numbers.
///
/// A non-empty filter restricts status reporting to its members and
/// disables discovery of the device universe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter(BTreeSet<String>);

impl DeviceFilter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            ids.into_iter()
                .map(Into::<String>::into)
                .filter(|id| !id.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn include(&self, id: &str) -> bool {
        self.0.is_empty() || self.0.contains(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// The set of devices real-time data is requested for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSet {
    /// Fixed at startup from the static filter; never replaced.
    Filtered(Vec<String>),
    /// Replaced wholesale by every successful device listing.
    Discovered(Vec<String>),
}

impl DeviceSet {
    pub fn ids(&self) -> &[String] {
        match self {
            Self::Filtered(ids) | Self::Discovered(ids) => ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(DeviceStatus::from_code(1).to_string(), "Online");
        assert_eq!(DeviceStatus::from_code(2).to_string(), "Fault");
        assert_eq!(DeviceStatus::from_code(3).to_string(), "Offline");
        assert_eq!(DeviceStatus::from_code(4).to_string(), "Unknown:4");
        assert_eq!(DeviceStatus::from_code(4).code(), 4);
    }

    #[test]
    fn test_include_with_filter() {
        let filter = DeviceFilter::new(["A"]);
        assert!(filter.include("A"));
        assert!(!filter.include("B"));
    }

    #[test]
    fn test_include_without_filter() {
        let filter = DeviceFilter::default();
        assert!(filter.include("A"));
        assert!(filter.include("anything"));
    }

    #[test]
    fn test_filter_drops_blank_ids() {
        let filter = DeviceFilter::new(["", "B", "A", "B"]);
        assert_eq!(filter.ids(), vec!["A".to_string(), "B".to_string()]);
    }
}
