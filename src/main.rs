mod adapters;
mod application;
mod config;
mod domain;
mod error;
mod interface;
mod ports;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adapters::{DeviceCache, FoxessClient, MetricsState, QuotaCache};
use application::{PollingService, Scheduler};
use config::Config;
use domain::interval::QUOTA_REFRESH_INTERVAL;
use error::ConfigError;
use interface::http::create_router;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("foxess_exporter={},tower_http=info", config.effective_log_level()).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting FoxESS exporter v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {:?}", config);

    let (intervals, budget) = config.intervals();
    info!(
        "Effective intervals: real-time {}, status {} ({} calls per day)",
        humantime::format_duration(intervals.real_time),
        humantime::format_duration(intervals.status),
        intervals.calls_per_day()
    );
    if let Err(e) = budget {
        error!("✗ Refusing to start: {}", e);
        return Err(ConfigError::from(e).into());
    }

    // Initialize adapters
    let client = FoxessClient::new(&config.base_url, &config.api_key, config.request_timeout)?;
    let quota = Arc::new(QuotaCache::new());
    let devices = Arc::new(DeviceCache::new());
    let metrics = Arc::new(MetricsState::new()?);

    let filter = config.device_filter();
    if filter.is_empty() {
        info!("No inverters configured, devices will be discovered");
    } else {
        info!("Monitoring configured inverters: {:?}", filter.ids());
    }

    // Start polling
    let polling = Arc::new(PollingService::new(
        Arc::new(client),
        quota.clone(),
        devices,
        metrics.clone(),
        filter,
        config.variables.clone(),
    ));
    let scheduler = Scheduler::new(quota);
    let _pollers = polling.start(&scheduler, intervals);

    info!(
        "✓ Polling started (quota every {})",
        humantime::format_duration(QUOTA_REFRESH_INTERVAL)
    );

    // Create HTTP server
    let app = create_router(metrics);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("✓ FoxESS exporter listening on {}", addr);
    info!("  → Metrics: http://localhost:{}/metrics", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
