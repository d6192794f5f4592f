//! Observability for the NF simulator.
//!
//! - **Logging**: structured JSON or pretty output via `tracing-subscriber`
//! - **Metrics**: Prometheus text exposition via the `metrics` crate
//!
//! Both roles call [`init_telemetry`] once at startup, before any listener
//! starts. The rendered metrics are served by the roles themselves at
//! `GET /metrics`.
//!
//! ```text
//! # HELP nfsim_handshakes_total Completed /api handshakes by outcome
//! # TYPE nfsim_handshakes_total counter
//! nfsim_handshakes_total{outcome="completed"} 3
//! nfsim_handshakes_total{outcome="callback_timeout"} 1
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use self::error::TelemetryError;
pub use self::logging::{init_logging, LogConfig};
pub use self::metrics::{init_metrics, render_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Combined telemetry configuration.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    tracing::debug!(
        json = config.logging.json_format,
        metrics = config.metrics.enabled,
        "telemetry initialized"
    );
    Ok(())
}
