use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::store::{DeviceCache, MetricsState, QuotaCache};
use crate::domain::interval::QUOTA_REFRESH_INTERVAL;
use crate::domain::{DeviceFilter, IntervalConfig, QuotaSnapshot};
use crate::error::PollError;
use crate::ports::TelemetrySource;

use super::Scheduler;

/// The three poll tasks that feed the caches and the published gauges
pub struct PollingService {
    source: Arc<dyn TelemetrySource>,
    quota: Arc<QuotaCache>,
    devices: Arc<DeviceCache>,
    metrics: Arc<MetricsState>,
    filter: DeviceFilter,
    variables: Vec<String>,
}

impl PollingService {
    /// Seeds `devices` from `filter` when the filter is non-empty.
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        quota: Arc<QuotaCache>,
        devices: Arc<DeviceCache>,
        metrics: Arc<MetricsState>,
        filter: DeviceFilter,
        variables: Vec<String>,
    ) -> Self {
        devices.initialise(&filter);

        Self {
            source,
            quota,
            devices,
            metrics,
            filter,
            variables,
        }
    }

    /// Refresh the quota snapshot. On failure the previous snapshot stays.
    pub async fn update_api_quota(&self) -> Result<QuotaSnapshot, PollError> {
        debug!("Updating API usage");
        let usage = self.source.get_usage().await.map_err(PollError::Quota)?;

        self.quota.set(usage);
        info!(
            "Usage: {:.0}/{:.0} ({:.2}%)",
            usage.used(),
            usage.total,
            usage.percentage_used
        );
        Ok(usage)
    }

    /// Refresh device status gauges and, without a static filter, the
    /// discovered device set. Returns the number of devices listed.
    pub async fn update_device_status(&self) -> Result<usize, PollError> {
        debug!("Retrieving device status");
        let devices = self
            .source
            .list_devices()
            .await
            .map_err(PollError::DeviceStatus)?;

        self.metrics.update_status(&devices, &self.filter);

        if self.filter.is_empty() {
            let ids = devices.iter().map(|d| d.serial_number.clone()).collect();
            self.devices.set_discovered(ids);
        }

        Ok(devices.len())
    }

    /// Fetch real-time values for the current device set and publish the
    /// batches that carry a new timestamp. Returns the number applied.
    ///
    /// Waits for the first discovered device list when there is no filter.
    pub async fn update_real_time(&self) -> Result<usize, PollError> {
        let devices = self.devices.get().await;
        debug!("Retrieving latest real-time data for {} devices", devices.ids().len());

        let readings = self
            .source
            .get_real_time_data(devices.ids(), &self.variables)
            .await
            .map_err(PollError::RealTime)?;

        Ok(self.metrics.update_real_time(&readings))
    }

    /// Start all three tasks on `scheduler`.
    ///
    /// The quota refresh runs ungated on its fixed cadence; the other two are
    /// gated on available quota.
    pub fn start(
        self: &Arc<Self>,
        scheduler: &Scheduler,
        intervals: IntervalConfig,
    ) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_poll(scheduler, "api-quota", QUOTA_REFRESH_INTERVAL, false, |s| async move {
                s.update_api_quota().await
            }),
            self.spawn_poll(scheduler, "device-status", intervals.status, true, |s| async move {
                s.update_device_status().await
            }),
            self.spawn_poll(scheduler, "real-time", intervals.real_time, true, |s| async move {
                s.update_real_time().await
            }),
        ]
    }

    fn spawn_poll<F, Fut, T>(
        self: &Arc<Self>,
        scheduler: &Scheduler,
        name: &'static str,
        interval: Duration,
        gated: bool,
        poll: F,
    ) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, PollError>> + Send + 'static,
    {
        let service = self.clone();
        scheduler.schedule(name, interval, gated, move || {
            let poll = poll(service.clone());
            async move {
                if let Err(e) = poll.await {
                    warn!(task = name, "{}", e);
                }
            }
        })
    }
}
