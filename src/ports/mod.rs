pub mod telemetry_source;

pub use telemetry_source::TelemetrySource;
