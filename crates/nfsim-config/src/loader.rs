//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading a role
//! configuration from defaults, a file and environment variables.

use std::env;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use crate::{ConfigError, NfConfig};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file (JSON or TOML)
/// 3. Environment variables (`PREFIX__SECTION__KEY`)
///
/// # Example
///
/// ```no_run
/// use nfsim_config::{ConfigLoader, Nf2Config};
///
/// # fn main() -> Result<(), nfsim_config::ConfigError> {
/// let config = ConfigLoader::<Nf2Config>::new()
///     .with_file("config/nf.json")?
///     .with_dotenv()
///     .with_env()
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader<C> {
    config: C,
    env_prefix: Option<String>,
    _role: PhantomData<fn() -> C>,
}

impl<C: NfConfig> Default for ConfigLoader<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: NfConfig> ConfigLoader<C> {
    /// Create a new loader starting from defaults.
    pub fn new() -> Self {
        Self {
            config: C::default(),
            env_prefix: None,
            _role: PhantomData,
        }
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.json` or `.toml`. Unknown keys
    /// are ignored.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a string in the given format (`json` or `toml`).
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Use the role's own environment prefix (`NF1` or `NF2`).
    pub fn with_env(self) -> Self {
        self.with_env_prefix(C::ENV_PREFIX)
    }

    /// Set environment variable prefix for overrides.
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if one exists.
    pub fn with_dotenv(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        self
    }

    /// Apply environment overrides and validate.
    ///
    /// Call [`NfConfig::log_summary`] once logging is installed.
    pub fn load(mut self) -> Result<C, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without environment overrides or validation.
    pub fn load_unvalidated(self) -> C {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<C, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("json") => Ok(serde_json::from_str(content)?),
            Some("toml") => Ok(toml::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_overrides<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix(&marker) else {
                continue;
            };
            let path: Vec<&str> = rest.split("__").collect();
            self.config.apply_env_var(&path, &value, &key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogFormat, Nf1Config, Nf2Config};
    use std::io::Write;

    const NF1_JSON: &str = r#"{
        "remotenfapiroot": "http://localhost:8083/nf2",
        "localapirootprefix": "http://",
        "nfNotificationResUriPath": "",
        "HTTPConfig": {
            "apiendpoint": ":8081",
            "nfendpoint": "localhost:8082"
        }
    }"#;

    fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loader_json_file() {
        let file = write_temp(NF1_JSON, ".json");
        let config = ConfigLoader::<Nf1Config>::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.remote_nf_api_root, "http://localhost:8083/nf2");
        assert_eq!(config.http.apiendpoint, ":8081");
        assert_eq!(config.http.nfendpoint, "localhost:8082");
        assert_eq!(config.callback_path(), "/nf1");
        assert_eq!(config.peer.timeout_secs, 15);
    }

    #[test]
    fn test_loader_toml_file() {
        let toml = r#"
            nfendpoint = "localhost:8083"
            localapirootprefix = "http://"

            [relay]
            delayMs = 250

            [telemetry]
            logFormat = "pretty"
        "#;
        let file = write_temp(toml, ".toml");
        let config = ConfigLoader::<Nf2Config>::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.relay.delay_ms, 250);
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_ignores_unknown_keys() {
        let json = r#"{"nfendpoint": ":8083", "localapirootprefix": "http://", "legacy": true}"#;
        let config = ConfigLoader::<Nf2Config>::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.nfendpoint, ":8083");
    }

    #[test]
    fn test_loader_file_not_found() {
        let result = ConfigLoader::<Nf1Config>::new().with_file("/nonexistent/nf.json");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_unsupported_extension() {
        let file = write_temp(NF1_JSON, ".yaml");
        let result = ConfigLoader::<Nf1Config>::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_malformed_json() {
        let file = write_temp("{\"remotenfapiroot\": ", ".json");
        let result = ConfigLoader::<Nf1Config>::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::JsonError(_))));
    }

    #[test]
    fn test_loader_validation_runs_on_load() {
        let json = r#"{"remotenfapiroot": "ftp://localhost/nf2", "HTTPConfig": {"apiendpoint": ":1", "nfendpoint": ":2"}}"#;
        let result = ConfigLoader::<Nf1Config>::new()
            .with_string(json, "json")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_loader_load_unvalidated() {
        let config = ConfigLoader::<Nf1Config>::new().load_unvalidated();
        assert!(config.http.apiendpoint.is_empty());
    }

    #[test]
    fn test_apply_overrides() {
        let mut loader = ConfigLoader::<Nf1Config>::new()
            .with_string(NF1_JSON, "json")
            .unwrap();
        let vars = vec![
            ("NF1__HTTPCONFIG__NFENDPOINT".to_string(), "nf1.local:9082".to_string()),
            ("NF1__TELEMETRY__METRICS_ENABLED".to_string(), "off".to_string()),
            ("NF2__NFENDPOINT".to_string(), ":1".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        loader.apply_overrides("NF1", vars).unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.http.nfendpoint, "nf1.local:9082");
        assert!(!config.telemetry.metrics_enabled);
        assert_eq!(config.callback_location(), "http://nf1.local:9082/nf1");
    }

    #[test]
    fn test_apply_overrides_invalid() {
        let mut loader = ConfigLoader::<Nf2Config>::new();
        let vars = vec![("NF2__RELAY__DELAY_MS".to_string(), "later".to_string())];
        let result = loader.apply_overrides("NF2", vars);
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }
}
