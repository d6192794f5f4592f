//! Startup errors of the NF roles.

use thiserror::Error;

use nfsim_config::ConfigError;
use nfsim_core::HandshakeError;
use nfsim_telemetry::TelemetryError;

/// Errors that stop a role before it serves anything.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be initialized.
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// A shared component could not be built.
    #[error("startup error: {0}")]
    Startup(#[from] HandshakeError),
}

/// Result type for role startup.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: AppError = ConfigError::missing_field("nfendpoint").into();
        assert!(err.to_string().starts_with("configuration error"));

        let err: AppError = HandshakeError::internal("no client").into();
        assert_eq!(err.to_string(), format!("startup error: {}", HandshakeError::internal("no client")));
    }
}
