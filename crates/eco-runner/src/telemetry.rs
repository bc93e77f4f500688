//! Log subscriber setup and metric helpers for the runner.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the default filter and
/// `ECO_LOG_FORMAT=json` switches to JSON lines.
pub fn init_telemetry() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,eco_world=debug".into());
    let json = std::env::var("ECO_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }

    info!(json, "Telemetry initialized");
    Ok(())
}

/// Record a counter metric
macro_rules! record_counter {
    ($name:expr, $value:expr) => {
        tracing::info!(counter_name = $name, counter_value = $value, "Counter metric");
    };
    ($name:expr, $value:expr, tick = $tick:expr) => {
        tracing::info!(counter_name = $name, counter_value = $value, tick = $tick, "Counter metric");
    };
}

/// Record a gauge metric
macro_rules! record_gauge {
    ($name:expr, $value:expr) => {
        tracing::info!(gauge_name = $name, gauge_value = $value, "Gauge metric");
    };
    ($name:expr, $value:expr, tick = $tick:expr) => {
        tracing::info!(gauge_name = $name, gauge_value = $value, tick = $tick, "Gauge metric");
    };
}

/// Record a histogram metric
macro_rules! record_histogram {
    ($name:expr, $value:expr) => {
        tracing::info!(histogram_name = $name, histogram_value = $value, "Histogram metric");
    };
}
