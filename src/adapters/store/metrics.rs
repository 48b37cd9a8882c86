use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, FixedOffset};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, info};

use crate::domain::{Device, DeviceFilter, RealTimeReading};

/// Gauges republished to the scrape endpoint, plus the per-device
/// timestamps used to skip real-time batches that were already applied.
pub struct MetricsState {
    status: GaugeVec,
    realtime: GaugeVec,
    // Only the real-time poll writes and reads this; the lock is uncontended.
    last_observed_at: Mutex<HashMap<String, DateTime<FixedOffset>>>,
    registry: Registry,
}

impl MetricsState {
    pub fn new() -> Result<Self, prometheus::Error> {
        let status = GaugeVec::new(
            Opts::new("foxess_device_status", "Status of the inverter."),
            &["inverter"],
        )?;
        let realtime = GaugeVec::new(
            Opts::new("foxess_realtime_data", "Data from the FoxESS platform."),
            &["inverter", "variable"],
        )?;

        let registry = Registry::new();
        registry.register(Box::new(status.clone()))?;
        registry.register(Box::new(realtime.clone()))?;

        Ok(Self {
            status,
            realtime,
            last_observed_at: Mutex::new(HashMap::new()),
            registry,
        })
    }

    /// Overwrite the status gauge of every included device
    pub fn update_status(&self, devices: &[Device], filter: &DeviceFilter) {
        for device in devices.iter().filter(|d| filter.include(&d.serial_number)) {
            info!(
                "Setting status of {} to: {} ({})",
                device.serial_number,
                device.status.code(),
                device.status
            );
            self.status
                .with_label_values(&[device.serial_number.as_str()])
                .set(device.status.code() as f64);
        }
    }

    /// Apply real-time batches whose observation time differs from the
    /// last one recorded for the same device.
    ///
    /// Returns the number of batches applied.
    pub fn update_real_time(&self, readings: &[RealTimeReading]) -> usize {
        let mut last_observed_at = self
            .last_observed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut applied = 0;

        for reading in readings {
            if last_observed_at.get(&reading.device_id) == Some(&reading.observed_at) {
                debug!(
                    "Skipping {}, already reported timestamp: {}",
                    reading.device_id, reading.observed_at
                );
                continue;
            }

            info!(
                "Updating {} metric{} for {}, timestamp: {}.",
                reading.values.len(),
                pluralise(reading.values.len()),
                reading.device_id,
                reading.observed_at
            );
            last_observed_at.insert(reading.device_id.clone(), reading.observed_at);
            for value in &reading.values {
                self.realtime
                    .with_label_values(&[reading.device_id.as_str(), value.variable.as_str()])
                    .set(value.value);
            }
            applied += 1;
        }

        applied
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export(&self) -> Result<(String, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let body = String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics are not valid UTF-8: {}", e)))?;
        Ok((encoder.format_type().to_string(), body))
    }
}

#[cfg(test)]
impl MetricsState {
    /// Last status code published for a device
    pub fn status(&self, device_id: &str) -> Option<f64> {
        find_gauge(&self.status, &[("inverter", device_id)])
    }

    /// Last value published for a device's variable
    pub fn real_time_value(&self, device_id: &str, variable: &str) -> Option<f64> {
        find_gauge(
            &self.realtime,
            &[("inverter", device_id), ("variable", variable)],
        )
    }
}

#[cfg(test)]
fn find_gauge(vec: &GaugeVec, labels: &[(&str, &str)]) -> Option<f64> {
    use prometheus::core::Collector;

    vec.collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .find(|metric| {
            labels.iter().all(|(name, value)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
            })
        })
        .map(|metric| metric.get_gauge().get_value())
}

fn pluralise(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
