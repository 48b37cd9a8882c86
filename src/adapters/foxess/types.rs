//! Wire types for the FoxESS Open API

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{Device, DeviceStatus, RealTimeReading, VariableValue};
use crate::error::ApiError;

/// Every response is wrapped in this envelope
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "errno")]
    pub error_number: i64,
    #[serde(rename = "msg", default)]
    pub message: String,
    pub result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct AccessCount {
    #[serde(deserialize_with = "flexible_number")]
    pub total: f64,
    #[serde(deserialize_with = "flexible_number")]
    pub remaining: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListRequest {
    pub current_page: u32,
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListPage {
    #[serde(default)]
    pub total: usize,
    #[serde(rename = "data", default)]
    pub devices: Vec<WireDevice>,
}

#[derive(Debug, Deserialize)]
pub struct WireDevice {
    #[serde(rename = "deviceSN")]
    pub device_serial_number: String,
    #[serde(rename = "stationName", default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub status: i64,
}

impl From<WireDevice> for Device {
    fn from(device: WireDevice) -> Self {
        Device::new(device.device_serial_number, DeviceStatus::from_code(device.status))
            .with_station_name(device.station_name)
    }
}

#[derive(Debug, Serialize)]
pub struct RealTimeRequest<'a> {
    #[serde(rename = "sns")]
    pub serial_numbers: &'a [String],
    #[serde(skip_serializing_if = "no_variables")]
    pub variables: &'a [String],
}

fn no_variables(variables: &&[String]) -> bool {
    variables.is_empty()
}

#[derive(Debug, Deserialize)]
pub struct WireRealTimeData {
    #[serde(rename = "deviceSN")]
    pub device_serial_number: String,
    pub time: String,
    #[serde(rename = "datas", default)]
    pub variables: Vec<WireVariable>,
}

#[derive(Debug, Deserialize)]
pub struct WireVariable {
    pub variable: String,
    #[serde(default, deserialize_with = "flexible_number")]
    pub value: f64,
}

impl TryFrom<WireRealTimeData> for RealTimeReading {
    type Error = ApiError;

    fn try_from(data: WireRealTimeData) -> Result<Self, Self::Error> {
        let observed_at = parse_timestamp(&data.time)?;
        let values = data
            .variables
            .into_iter()
            .map(|v| VariableValue::new(v.variable, v.value))
            .collect();
        Ok(RealTimeReading::new(data.device_serial_number, observed_at).with_values(values))
    }
}

/// Parse timestamps like `2024-01-21 12:04:49 CET+0100`.
///
/// The zone abbreviation is ignored; the numeric offset that follows it is
/// authoritative.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ApiError> {
    let invalid = |reason: &str| ApiError::InvalidTimestamp {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (date_time, zone) = value
        .trim()
        .rsplit_once(' ')
        .ok_or_else(|| invalid("missing time zone"))?;
    let offset = zone.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    if offset.is_empty() {
        return Err(invalid("missing numeric offset"));
    }

    DateTime::parse_from_str(&format!("{} {}", date_time, offset), "%Y-%m-%d %H:%M:%S %z")
        .map_err(|e| invalid(&e.to_string()))
}

/// Accepts a JSON number, a numeric string, an empty string or null.
/// Empty strings and null read as zero.
fn flexible_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(Raw::Number(n)) => Ok(n),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("failed to parse '{}' as a number", s))),
    }
}
