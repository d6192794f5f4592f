//! Wiring of the two roles.
//!
//! [`Nf1App`] and [`Nf2App`] own everything a role shares between its
//! handlers: the frozen configuration, the peer client and, for NF1, the
//! notification gate. They hand out the listener definitions that
//! [`ServerLifecycle`] runs.

use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;

use http::StatusCode;

use nfsim_config::{ConfigLoader, LogFormat, Nf1Config, Nf2Config, NfConfig, ServerSettings, TelemetrySettings};
use nfsim_core::{CorrelationPayload, NotificationGate};
use nfsim_server::{
    response, HttpResponse, InboundRequest, ListenerDef, ListenerOutcome, ListenerSettings,
    Router, ServerLifecycle, ShutdownReport, ShutdownSignal,
};
use nfsim_telemetry::{init_telemetry, render_metrics, LogConfig, MetricsConfig, TelemetryConfig};

use crate::callback::CallbackEndpoint;
use crate::error::AppResult;
use crate::frontend::ApiFrontend;
use crate::peer::PeerClient;
use crate::relay::DelayedRelay;

/// Path of the NF1 API route.
pub const API_PATH: &str = "/api";

/// Path of the Prometheus exposition route.
pub const METRICS_PATH: &str = "/metrics";

/// Loads a role configuration from `path`, a `.env` file and the role's
/// environment overrides, then validates it.
pub fn load_config<C: NfConfig>(path: impl AsRef<Path>) -> AppResult<C> {
    let config = ConfigLoader::<C>::new()
        .with_file(path)?
        .with_dotenv()
        .with_env()
        .load()?;
    Ok(config)
}

/// Maps the `telemetry` section onto the telemetry crate's settings.
pub fn telemetry_config(settings: &TelemetrySettings) -> TelemetryConfig {
    TelemetryConfig {
        logging: LogConfig {
            level: settings.log_level.clone(),
            json_format: settings.log_format == LogFormat::Json,
            ..LogConfig::default()
        },
        metrics: MetricsConfig {
            enabled: settings.metrics_enabled,
            ..MetricsConfig::default()
        },
    }
}

/// Installs logging and metrics from the role's `telemetry` section.
pub fn init_role_telemetry<C: NfConfig>(config: &C) -> AppResult<()> {
    init_telemetry(&telemetry_config(config.telemetry()))?;
    Ok(())
}

/// Maps the `server` section onto listener limits.
pub fn listener_settings(settings: &ServerSettings) -> ListenerSettings {
    ListenerSettings {
        read_timeout: settings.read_timeout(),
        max_header_bytes: settings.max_header_bytes,
        drain_timeout: settings.drain_timeout(),
    }
}

/// Logs how each listener of a finished lifecycle ended.
pub fn log_report(role: &str, report: &ShutdownReport) {
    for listener in &report.listeners {
        match &listener.outcome {
            ListenerOutcome::Closed { connections, drained } => tracing::info!(
                role,
                listener = %listener.name,
                connections,
                drained,
                "HTTP server stopped"
            ),
            ListenerOutcome::BindFailed(e) => tracing::error!(
                role,
                listener = %listener.name,
                error = %e,
                "HTTP server never started"
            ),
        }
    }
}

fn role_lifecycle<C: NfConfig>(config: &C, shutdown: ShutdownSignal) -> ServerLifecycle {
    ServerLifecycle::new(shutdown).with_settings(listener_settings(config.server()))
}

async fn metrics_endpoint(_req: InboundRequest) -> HttpResponse {
    match render_metrics() {
        Some(body) => response::text(StatusCode::OK, body),
        None => response::error(StatusCode::NOT_FOUND, "metrics_disabled", "Metrics are not enabled"),
    }
}

/// The NF1 role: API frontend plus callback endpoint.
#[derive(Debug, Clone)]
pub struct Nf1App {
    config: Arc<Nf1Config>,
    gate: Arc<NotificationGate<CorrelationPayload>>,
    frontend: Arc<ApiFrontend>,
    callback: CallbackEndpoint,
}

impl Nf1App {
    /// Builds the role from a validated configuration.
    pub fn new(config: Nf1Config) -> AppResult<Self> {
        let peer = PeerClient::new(&config.peer)?;
        let gate = Arc::new(NotificationGate::new());
        let frontend = Arc::new(ApiFrontend::new(&config, peer, Arc::clone(&gate)));
        let callback = CallbackEndpoint::new(Arc::clone(&gate));

        Ok(Self {
            config: Arc::new(config),
            gate,
            frontend,
            callback,
        })
    }

    /// The frozen configuration.
    pub fn config(&self) -> &Nf1Config {
        &self.config
    }

    /// The gate shared by the frontend and the callback endpoint.
    pub fn gate(&self) -> &Arc<NotificationGate<CorrelationPayload>> {
        &self.gate
    }

    /// Routes of the API listener.
    pub fn api_router(&self) -> Router {
        let frontend = Arc::clone(&self.frontend);
        Router::new()
            .post(API_PATH, move |req| {
                let frontend = Arc::clone(&frontend);
                async move { frontend.handle(req).await }
            })
            .get(METRICS_PATH, metrics_endpoint)
    }

    /// Routes of the callback listener.
    pub fn nf_router(&self) -> Router {
        let callback = self.callback.clone();
        Router::new().post(self.config.callback_path(), move |req| {
            let callback = callback.clone();
            async move { callback.handle(req).await }
        })
    }

    /// Listener definitions on the configured endpoints.
    pub fn listeners(&self) -> Vec<ListenerDef> {
        vec![
            ListenerDef::new("api", self.config.http.apiendpoint.clone(), self.api_router()),
            ListenerDef::new("nf", self.config.http.nfendpoint.clone(), self.nf_router()),
        ]
    }

    /// Listener definitions on sockets the caller already bound.
    pub fn listeners_on(&self, api: TcpListener, nf: TcpListener) -> Vec<ListenerDef> {
        vec![
            ListenerDef::bound("api", api, self.api_router()),
            ListenerDef::bound("nf", nf, self.nf_router()),
        ]
    }

    /// A lifecycle with this role's listener limits and no listeners yet.
    pub fn lifecycle(&self, shutdown: ShutdownSignal) -> ServerLifecycle {
        role_lifecycle(self.config.as_ref(), shutdown)
    }
}

/// The NF2 role: the delayed relay.
#[derive(Debug, Clone)]
pub struct Nf2App {
    config: Arc<Nf2Config>,
    relay: DelayedRelay,
}

impl Nf2App {
    /// Builds the role from a validated configuration.
    pub fn new(config: Nf2Config) -> AppResult<Self> {
        let peer = PeerClient::new(&config.peer)?;
        let relay = DelayedRelay::new(&config, peer);

        Ok(Self {
            config: Arc::new(config),
            relay,
        })
    }

    /// The frozen configuration.
    pub fn config(&self) -> &Nf2Config {
        &self.config
    }

    /// Routes of the relay listener.
    pub fn router(&self) -> Router {
        let relay = self.relay.clone();
        Router::new()
            .post(Nf2Config::RELAY_PATH, move |req| {
                let relay = relay.clone();
                async move { relay.handle(req).await }
            })
            .get(METRICS_PATH, metrics_endpoint)
    }

    /// Listener definitions on the configured endpoint.
    pub fn listeners(&self) -> Vec<ListenerDef> {
        vec![ListenerDef::new("nf2", self.config.nfendpoint.clone(), self.router())]
    }

    /// Listener definitions on a socket the caller already bound.
    pub fn listeners_on(&self, nf: TcpListener) -> Vec<ListenerDef> {
        vec![ListenerDef::bound("nf2", nf, self.router())]
    }

    /// A lifecycle with this role's listener limits and no listeners yet.
    pub fn lifecycle(&self, shutdown: ShutdownSignal) -> ServerLifecycle {
        role_lifecycle(self.config.as_ref(), shutdown)
    }
}
