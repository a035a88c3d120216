//! Telemetry module
//!
//! Logging and Prometheus metrics

mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::init_metrics;

use crate::config::TelemetryConfig;
use tracing_appender::non_blocking::WorkerGuard;

/// Initialize logging and, when a port is configured, the metrics exporter.
///
/// Returns the log file guard when file logging is enabled.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let guard = init_logging(
        &config.log_level,
        config.log_format,
        config.log_file.as_deref(),
    )?;

    if let Some(port) = config.metrics_port {
        init_metrics(port)?;
    }

    Ok(guard)
}
