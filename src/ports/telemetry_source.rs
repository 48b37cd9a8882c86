use async_trait::async_trait;

use crate::domain::{Device, QuotaSnapshot, RealTimeReading};
use crate::error::ApiError;

/// Port for the upstream inverter telemetry API
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Current daily API usage
    async fn get_usage(&self) -> Result<QuotaSnapshot, ApiError>;

    /// Every device visible to the account
    async fn list_devices(&self) -> Result<Vec<Device>, ApiError>;

    /// Latest real-time values for the given devices.
    ///
    /// An empty `variables` slice requests every variable.
    async fn get_real_time_data(
        &self,
        device_ids: &[String],
        variables: &[String],
    ) -> Result<Vec<RealTimeReading>, ApiError>;
}
