//! Prometheus metrics.
//!
//! Recording goes through the `metrics` facade. Until [`init_metrics`]
//! installs the Prometheus recorder every `record_*` call is a no-op.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `nfsim_handshakes_total` | Counter | `outcome` |
//! | `nfsim_handshake_duration_seconds` | Histogram | `outcome` |
//! | `nfsim_handshakes_in_flight` | Gauge | - |
//! | `nfsim_callbacks_total` | Counter | `result` |
//! | `nfsim_relays_total` | Counter | `outcome` |
//! | `nfsim_peer_requests_total` | Counter | `status` |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const HANDSHAKES_TOTAL: &str = "nfsim_handshakes_total";
const HANDSHAKE_DURATION: &str = "nfsim_handshake_duration_seconds";
const HANDSHAKES_IN_FLIGHT: &str = "nfsim_handshakes_in_flight";
const CALLBACKS_TOTAL: &str = "nfsim_callbacks_total";
const RELAYS_TOTAL: &str = "nfsim_relays_total";
const PEER_REQUESTS_TOTAL: &str = "nfsim_peer_requests_total";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Histogram buckets for handshake duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // Relay delay is 1s by default, so resolution is spent around it.
            duration_buckets: vec![0.05, 0.1, 0.25, 0.5, 1.0, 1.5, 2.0, 5.0, 10.0, 30.0],
        }
    }
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if the buckets are rejected or a
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HANDSHAKE_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

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
    describe_counter!(HANDSHAKES_TOTAL, "Completed /api handshakes by outcome");
    describe_histogram!(
        HANDSHAKE_DURATION,
        "Time from /api request to callback release, in seconds"
    );
    describe_gauge!(HANDSHAKES_IN_FLIGHT, "Handshakes currently waiting");
    describe_counter!(CALLBACKS_TOTAL, "Callbacks received by result");
    describe_counter!(RELAYS_TOTAL, "Delayed relays by outcome");
    describe_counter!(PEER_REQUESTS_TOTAL, "Outbound peer requests by status");
}

/// Records a finished handshake.
///
/// `outcome` is `completed` or an error category.
pub fn record_handshake(outcome: &'static str, duration: Duration) {
    counter!(HANDSHAKES_TOTAL, "outcome" => outcome).increment(1);
    histogram!(HANDSHAKE_DURATION, "outcome" => outcome).record(duration.as_secs_f64());
}

/// Records a callback (`accepted` or `rejected`).
pub fn record_callback(result: &'static str) {
    counter!(CALLBACKS_TOTAL, "result" => result).increment(1);
}

/// Records the end of a delayed relay (`sent`, `failed` or `cancelled`).
pub fn record_relay(outcome: &'static str) {
    counter!(RELAYS_TOTAL, "outcome" => outcome).increment(1);
}

/// Records an outbound peer request. `status` is `None` when no response
/// arrived.
pub fn record_peer_request(status: Option<u16>) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    counter!(PEER_REQUESTS_TOTAL, "status" => status).increment(1);
}

/// Keeps `nfsim_handshakes_in_flight` raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge and returns the guard that decrements it.
    #[must_use]
    pub fn new() -> Self {
        gauge!(HANDSHAKES_IN_FLIGHT).increment(1.0);
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
        gauge!(HANDSHAKES_IN_FLIGHT).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert!(config.duration_buckets.contains(&1.0));
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_handshake("completed", Duration::from_millis(1200));
        record_callback("accepted");
        record_relay("cancelled");
        record_peer_request(Some(200));
        record_peer_request(None);
        drop(InFlightGuard::new());
    }

    #[test]
    fn test_disabled_metrics() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_metrics(&config).is_ok());
    }
}
