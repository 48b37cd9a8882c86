pub mod foxess;
pub mod store;

pub use foxess::FoxessClient;
pub use store::{DeviceCache, MetricsState, QuotaCache};
