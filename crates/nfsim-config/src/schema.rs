//! Optional configuration sections shared by both roles.
//!
//! Every field has a default, so a file that only carries the endpoint keys
//! is complete. Section keys are camelCase in files
//! (`"peer": {"timeoutSecs": 15}`) and upper snake case in environment
//! overrides (`NF1__PEER__TIMEOUT_SECS=15`).

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeerSettings {
    /// Client-side timeout for a whole outbound call, in seconds.
    #[serde(default = "default_peer_timeout")]
    pub timeout_secs: u64,

    /// Value of the `User-Agent` header on outbound calls.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_peer_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl PeerSettings {
    /// Returns the client timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "peer.timeoutSecs",
                "must be greater than zero",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid_value("peer.userAgent", "must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn apply_env(&mut self, field: &str, value: &str, var: &str) -> Result<(), ConfigError> {
        match field {
            "TIMEOUT_SECS" => self.timeout_secs = parse_u64(value, var)?,
            "USER_AGENT" => self.user_agent = value.to_string(),
            _ => {}
        }
        Ok(())
    }
}

fn default_peer_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    "NEF-OPENNESS-1912".to_string()
}

/// How the `/api` handler waits for its callback.
///
/// The defaults fail fast on peer errors (502) and bound the wait (504).
/// `failFastOnPeerError: false` with `callbackTimeoutSecs: 0` gives the
/// log-and-wait behaviour, where `/api` only ends on a callback or on
/// cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeSettings {
    /// Upper bound on the wait for a callback, in seconds. Zero waits until
    /// the request is cancelled.
    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_secs: u64,

    /// Fail the `/api` request with 502 when the peer call fails, instead of
    /// waiting for a callback anyway.
    #[serde(default = "default_true")]
    pub fail_fast_on_peer_error: bool,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            callback_timeout_secs: default_callback_timeout(),
            fail_fast_on_peer_error: true,
        }
    }
}

impl HandshakeSettings {
    /// Returns the callback wait bound, or `None` when disabled.
    pub fn callback_timeout(&self) -> Option<Duration> {
        (self.callback_timeout_secs > 0).then_some(Duration::from_secs(self.callback_timeout_secs))
    }

    pub(crate) fn apply_env(&mut self, field: &str, value: &str, var: &str) -> Result<(), ConfigError> {
        match field {
            "CALLBACK_TIMEOUT_SECS" => self.callback_timeout_secs = parse_u64(value, var)?,
            "FAIL_FAST_ON_PEER_ERROR" => {
                self.fail_fast_on_peer_error = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(var, "expected boolean"))?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn default_callback_timeout() -> u64 {
    30
}

/// Delayed relay settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelaySettings {
    /// Delay before the reply is posted back, in milliseconds.
    #[serde(default = "default_relay_delay")]
    pub delay_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            delay_ms: default_relay_delay(),
        }
    }
}

impl RelaySettings {
    /// Returns the relay delay.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub(crate) fn apply_env(&mut self, field: &str, value: &str, var: &str) -> Result<(), ConfigError> {
        if field == "DELAY_MS" {
            self.delay_ms = parse_u64(value, var)?;
        }
        Ok(())
    }
}

fn default_relay_delay() -> u64 {
    1000
}

/// Listener limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    /// Bound on reading request headers and on collecting a body, in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Largest accepted request head, in bytes.
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,

    /// How long shutdown waits for in-flight work, in seconds.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            read_timeout_secs: default_read_timeout(),
            max_header_bytes: default_max_header_bytes(),
            drain_timeout_secs: default_drain_timeout(),
        }
    }
}

impl ServerSettings {
    /// Smallest accepted `maxHeaderBytes`.
    pub const MIN_HEADER_BYTES: usize = 8192;

    /// Returns the read timeout.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Returns the drain timeout.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.read_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.readTimeoutSecs",
                "must be greater than zero",
            ));
        }
        if self.max_header_bytes < Self::MIN_HEADER_BYTES {
            return Err(ConfigError::invalid_value(
                "server.maxHeaderBytes",
                format!("must be at least {}", Self::MIN_HEADER_BYTES),
            ));
        }
        Ok(())
    }

    pub(crate) fn apply_env(&mut self, field: &str, value: &str, var: &str) -> Result<(), ConfigError> {
        match field {
            "READ_TIMEOUT_SECS" => self.read_timeout_secs = parse_u64(value, var)?,
            "MAX_HEADER_BYTES" => {
                self.max_header_bytes = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(var, "expected integer"))?;
            }
            "DRAIN_TIMEOUT_SECS" => self.drain_timeout_secs = parse_u64(value, var)?,
            _ => {}
        }
        Ok(())
    }
}

fn default_read_timeout() -> u64 {
    10
}

fn default_max_header_bytes() -> usize {
    1 << 20
}

fn default_drain_timeout() -> u64 {
    5
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySettings {
    /// Default log level directive. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Install the Prometheus recorder and serve `GET /metrics`.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_enabled: true,
        }
    }
}

impl TelemetrySettings {
    pub(crate) fn apply_env(&mut self, field: &str, value: &str, var: &str) -> Result<(), ConfigError> {
        match field {
            "LOG_LEVEL" => self.log_level = value.to_string(),
            "LOG_FORMAT" => {
                self.log_format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            var,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            "METRICS_ENABLED" => {
                self.metrics_enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(var, "expected boolean"))?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Checks a `host:port` or `:port` listen address.
pub(crate) fn validate_endpoint(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    let Some((_host, port)) = value.rsplit_once(':') else {
        return Err(ConfigError::invalid_value(field, "expected host:port or :port"));
    };
    port.parse::<u16>()
        .map(|_| ())
        .map_err(|_| ConfigError::invalid_value(field, format!("invalid port '{port}'")))
}

/// Checks that the remote API root is an absolute `http` URI.
pub(crate) fn validate_remote_root(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    let uri: http::Uri = value
        .parse()
        .map_err(|e: http::uri::InvalidUri| ConfigError::invalid_value(field, e.to_string()))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => {
            return Err(ConfigError::invalid_value(
                field,
                format!("unsupported scheme '{other}', expected http"),
            ))
        }
        None => return Err(ConfigError::invalid_value(field, "missing http scheme")),
    }
    if uri.authority().is_none() {
        return Err(ConfigError::invalid_value(field, "missing host"));
    }
    Ok(())
}

fn parse_u64(value: &str, var: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(var, "expected integer"))
}

/// Parse a boolean from a string.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
