use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A single sampled variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableValue {
    pub variable: String,
    pub value: f64,
}

impl VariableValue {
    pub fn new(variable: impl Into<String>, value: f64) -> Self {
        Self {
            variable: variable.into(),
            value,
        }
    }
}

/// One device's batch of real-time values, all observed at the same instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealTimeReading {
    pub device_id: String,
    pub observed_at: DateTime<FixedOffset>,
    pub values: Vec<VariableValue>,
}

impl RealTimeReading {
    pub fn new(device_id: impl Into<String>, observed_at: DateTime<FixedOffset>) -> Self {
        Self {
            device_id: device_id.into(),
            observed_at,
            values: Vec::new(),
        }
    }

    pub fn with_values(mut self, values: Vec<VariableValue>) -> Self {
        self.values = values;
        self
    }
}
