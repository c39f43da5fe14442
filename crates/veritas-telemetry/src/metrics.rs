//! Prometheus metrics for Veritas.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `veritas_requests_total` | Counter | `method`, `route`, `status` | Total requests |
//! | `veritas_request_duration_seconds` | Histogram | `method`, `route` | Request latency |
//! | `veritas_in_flight_requests` | Gauge | - | In-flight requests |
//! | `veritas_validation_failures_total` | Counter | `section` | Rejected request sections |
//!
//! Recording functions are safe to call before [`init_metrics`]; the
//! `metrics` facade discards values until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Total requests served.
pub const REQUESTS_TOTAL: &str = "veritas_requests_total";
/// Request latency histogram.
pub const REQUEST_DURATION_SECONDS: &str = "veritas_request_duration_seconds";
/// Requests currently being processed.
pub const IN_FLIGHT_REQUESTS: &str = "veritas_in_flight_requests";
/// Request sections rejected by a route's schema.
pub const VALIDATION_FAILURES_TOTAL: &str = "veritas_validation_failures_total";

/// Route label used when no route matched.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Histogram buckets for request duration.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

impl From<&veritas_config::MetricsConfig> for MetricsConfig {
    fn from(config: &veritas_config::MetricsConfig) -> Self {
        Self {
            enabled: config.enabled,
            addr: config.addr.clone(),
            ..Self::default()
        }
    }
}

/// Installs the Prometheus recorder and its scrape endpoint.
///
/// Does nothing when `config.enabled` is false.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for a bad `addr`, or
/// `TelemetryError::MetricsInit` if the buckets are empty or a recorder is
/// already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();
    tracing::info!(%addr, "prometheus exporter listening");

    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests processed");
    describe_histogram!(REQUEST_DURATION_SECONDS, "HTTP request duration in seconds");
    describe_gauge!(
        IN_FLIGHT_REQUESTS,
        "Number of HTTP requests currently being processed"
    );
    describe_counter!(
        VALIDATION_FAILURES_TOTAL,
        "Request sections rejected by a route schema"
    );
}

/// Records a completed request.
///
/// `route` should be the matched route template, not the raw path, to keep
/// label cardinality bounded. Use [`UNMATCHED_ROUTE`] when nothing matched.
pub fn record_request(method: &str, route: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Decrements the in-flight gauge on drop, so early returns still count.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight counter.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert_eq!(config.duration_buckets.len(), 12);
    }

    #[test]
    fn test_from_metrics_section() {
        let section = veritas_config::MetricsConfig {
            enabled: true,
            addr: "127.0.0.1:9100".into(),
        };
        let config = MetricsConfig::from(&section);
        assert!(config.enabled);
        assert_eq!(config.addr, "127.0.0.1:9100");
        assert!(!config.duration_buckets.is_empty());
    }

    #[test]
    fn test_disabled_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_addr() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-addr".into(),
            ..Default::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_recording_without_recorder() {
        record_request("GET", "/with-schema", 200, Duration::from_millis(10));
        record_request("GET", UNMATCHED_ROUTE, 404, Duration::from_micros(80));
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
