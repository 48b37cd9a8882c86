pub mod device;
pub mod interval;
pub mod quota;
pub mod realtime;

pub use device::{Device, DeviceFilter, DeviceSet, DeviceStatus};
pub use interval::{IntervalConfig, IntervalError};
pub use quota::QuotaSnapshot;
pub use realtime::{RealTimeReading, VariableValue};
