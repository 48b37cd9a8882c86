pub mod cache;
pub mod metrics;

pub use cache::{DeviceCache, QuotaCache};
pub use metrics::MetricsState;
