//! Valuator - private company valuation service.
//!
//! Blends DCF, market comparables, and asset-based estimates into a value
//! range with a four-factor risk score.

use anyhow::{Context, Result};
use valuator_common::logging::init_logging_with_exclusions;
use valuator_common::Config;
use valuator_service::ValuatorService;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    let config = Config::load_and_validate().context("Failed to load configuration")?;

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    tracing::info!("Valuator v{}", env!("CARGO_PKG_VERSION"));

    let service = ValuatorService::new(config);

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
