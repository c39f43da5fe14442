//! Observability for Veritas services.
//!
//! - **Logging**: structured JSON or pretty output via `tracing-subscriber`
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! # Example
//!
//! ```rust,ignore
//! use veritas_config::ConfigLoader;
//! use veritas_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = ConfigLoader::new().with_process_env()?.load()?;
//! init_telemetry(&TelemetryConfig::from(&config))?;
//! ```
//!
//! # Metrics Endpoint
//!
//! When enabled, the exporter serves Prometheus text on its own address:
//!
//! ```text
//! # TYPE veritas_requests_total counter
//! veritas_requests_total{method="GET",route="/with-schema",status="200"} 1234
//! veritas_requests_total{method="GET",route="/with-schema",status="400"} 56
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use crate::metrics::{init_metrics, record_request, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_with_everything_disabled() {
        let config = TelemetryConfig::builder()
            .logging(LogConfig {
                enabled: false,
                ..LogConfig::default()
            })
            .build();
        assert!(init_telemetry(&config).is_ok());
    }
}
