//! Role configuration types.
//!
//! [`Nf1Config`] and [`Nf2Config`] mirror the `config/nf.json` files of the
//! two roles. The endpoint keys keep their historical spelling; the optional
//! sections from [`crate::schema`] use camelCase.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::schema::{validate_endpoint, validate_remote_root};
use crate::{
    ConfigError, HandshakeSettings, PeerSettings, RelaySettings, ServerSettings,
    TelemetrySettings,
};

/// Callback path used when `nfNotificationResUriPath` is absent or empty.
pub const DEFAULT_CALLBACK_PATH: &str = "/nf1";

/// Behaviour shared by the role configurations so one loader serves both.
pub trait NfConfig: DeserializeOwned + Default {
    /// Role name used in logs.
    const ROLE: &'static str;

    /// Prefix of the environment overrides, e.g. `NF1`.
    const ENV_PREFIX: &'static str;

    /// Validates the fully layered configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Applies one environment override. `path` holds the upper-case key
    /// segments after the prefix; unknown paths are ignored.
    fn apply_env_var(&mut self, path: &[&str], value: &str, var: &str)
        -> Result<(), ConfigError>;

    /// Logs the loaded configuration once at startup.
    fn log_summary(&self);

    /// Listener limits.
    fn server(&self) -> &ServerSettings;

    /// Logging and metrics settings.
    fn telemetry(&self) -> &TelemetrySettings;
}

/// Listen addresses of the NF1 role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Address of the `/api` listener.
    #[serde(default)]
    pub apiendpoint: String,

    /// Address of the callback listener.
    #[serde(default)]
    pub nfendpoint: String,
}

/// Configuration of the NF1 role (API frontend and callback endpoint).
///
/// # Example
///
/// ```
/// use nfsim_config::{ConfigLoader, Nf1Config};
///
/// let json = r#"{
///     "remotenfapiroot": "http://localhost:8083/nf2",
///     "localapirootprefix": "http://",
///     "HTTPConfig": { "apiendpoint": ":8081", "nfendpoint": "localhost:8082" }
/// }"#;
///
/// let config = ConfigLoader::<Nf1Config>::new()
///     .with_string(json, "json")
///     .unwrap()
///     .load()
///     .unwrap();
///
/// assert_eq!(config.callback_path(), "/nf1");
/// assert_eq!(config.callback_location(), "http://localhost:8082/nf1");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nf1Config {
    /// Full URL the handshake notification is posted to.
    #[serde(rename = "remotenfapiroot", default)]
    pub remote_nf_api_root: String,

    /// Prefix prepended to the callback endpoint to build the callback URL.
    #[serde(rename = "localapirootprefix", default)]
    pub local_api_root_prefix: String,

    /// Path of the callback route.
    #[serde(rename = "nfNotificationResUriPath", default)]
    pub notification_res_uri_path: String,

    /// Listen addresses.
    #[serde(
        rename = "HTTPConfig",
        alias = "httpConfig",
        alias = "httpconfig",
        default
    )]
    pub http: HttpConfig,

    /// Callback wait settings.
    #[serde(default)]
    pub handshake: HandshakeSettings,

    /// Outbound client settings.
    #[serde(default)]
    pub peer: PeerSettings,

    /// Listener limits.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging and metrics settings.
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Nf1Config {
    /// Returns the callback route, falling back to `/nf1`.
    pub fn callback_path(&self) -> &str {
        if self.notification_res_uri_path.is_empty() {
            DEFAULT_CALLBACK_PATH
        } else {
            &self.notification_res_uri_path
        }
    }

    /// Returns the URL the peer should call back.
    pub fn callback_location(&self) -> String {
        format!(
            "{}{}{}",
            self.local_api_root_prefix,
            self.http.nfendpoint,
            self.callback_path()
        )
    }
}

impl NfConfig for Nf1Config {
    const ROLE: &'static str = "nf1";
    const ENV_PREFIX: &'static str = "NF1";

    fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("HTTPConfig.apiendpoint", &self.http.apiendpoint)?;
        validate_endpoint("HTTPConfig.nfendpoint", &self.http.nfendpoint)?;
        validate_remote_root("remotenfapiroot", &self.remote_nf_api_root)?;

        if !self.notification_res_uri_path.is_empty()
            && !self.notification_res_uri_path.starts_with('/')
        {
            return Err(ConfigError::invalid_value(
                "nfNotificationResUriPath",
                "must start with '/'",
            ));
        }

        self.peer.validate()?;
        self.server.validate()
    }

    fn apply_env_var(
        &mut self,
        path: &[&str],
        value: &str,
        var: &str,
    ) -> Result<(), ConfigError> {
        match path {
            ["REMOTENFAPIROOT"] => self.remote_nf_api_root = value.to_string(),
            ["LOCALAPIROOTPREFIX"] => self.local_api_root_prefix = value.to_string(),
            ["NFNOTIFICATIONRESURIPATH"] => self.notification_res_uri_path = value.to_string(),
            ["HTTPCONFIG", "APIENDPOINT"] => self.http.apiendpoint = value.to_string(),
            ["HTTPCONFIG", "NFENDPOINT"] => self.http.nfendpoint = value.to_string(),
            ["HANDSHAKE", field] => self.handshake.apply_env(field, value, var)?,
            ["PEER", field] => self.peer.apply_env(field, value, var)?,
            ["SERVER", field] => self.server.apply_env(field, value, var)?,
            ["TELEMETRY", field] => self.telemetry.apply_env(field, value, var)?,
            _ => {}
        }
        Ok(())
    }

    fn log_summary(&self) {
        tracing::info!(
            role = Self::ROLE,
            remote_api = %self.remote_nf_api_root,
            local_api_root_prefix = %self.local_api_root_prefix,
            api_endpoint = %self.http.apiendpoint,
            nf_endpoint = %self.http.nfendpoint,
            callback_path = %self.callback_path(),
            callback_timeout_secs = self.handshake.callback_timeout_secs,
            fail_fast_on_peer_error = self.handshake.fail_fast_on_peer_error,
            "NF configuration loaded"
        );
    }

    fn server(&self) -> &ServerSettings {
        &self.server
    }

    fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }
}

/// Configuration of the NF2 role (delayed relay).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nf2Config {
    /// Address of the relay listener.
    #[serde(default)]
    pub nfendpoint: String,

    /// Prefix prepended to the endpoint to build the reply location.
    #[serde(rename = "localapirootprefix", default)]
    pub local_api_root_prefix: String,

    /// Relay delay settings.
    #[serde(default)]
    pub relay: RelaySettings,

    /// Outbound client settings.
    #[serde(default)]
    pub peer: PeerSettings,

    /// Listener limits.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging and metrics settings.
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Nf2Config {
    /// Path of the relay route.
    pub const RELAY_PATH: &'static str = "/nf2";

    /// Returns the location advertised in relay replies.
    pub fn reply_location(&self) -> String {
        format!(
            "{}{}{}",
            self.local_api_root_prefix,
            self.nfendpoint,
            Self::RELAY_PATH
        )
    }
}

impl NfConfig for Nf2Config {
    const ROLE: &'static str = "nf2";
    const ENV_PREFIX: &'static str = "NF2";

    fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("nfendpoint", &self.nfendpoint)?;
        self.peer.validate()?;
        self.server.validate()
    }

    fn apply_env_var(
        &mut self,
        path: &[&str],
        value: &str,
        var: &str,
    ) -> Result<(), ConfigError> {
        match path {
            ["NFENDPOINT"] => self.nfendpoint = value.to_string(),
            ["LOCALAPIROOTPREFIX"] => self.local_api_root_prefix = value.to_string(),
            ["RELAY", field] => self.relay.apply_env(field, value, var)?,
            ["PEER", field] => self.peer.apply_env(field, value, var)?,
            ["SERVER", field] => self.server.apply_env(field, value, var)?,
            ["TELEMETRY", field] => self.telemetry.apply_env(field, value, var)?,
            _ => {}
        }
        Ok(())
    }

    fn log_summary(&self) {
        tracing::info!(
            role = Self::ROLE,
            local_api_root_prefix = %self.local_api_root_prefix,
            nf_endpoint = %self.nfendpoint,
            relay_delay_ms = self.relay.delay_ms,
            "NF configuration loaded"
        );
    }

    fn server(&self) -> &ServerSettings {
        &self.server
    }

    fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }
}
