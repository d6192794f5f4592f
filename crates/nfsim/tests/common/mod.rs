//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use http::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use nfsim::{Nf1App, Nf2App};
use nfsim_config::{HttpConfig, Nf1Config, Nf2Config, RelaySettings, ServerSettings};
use nfsim_core::CorrelationPayload;
use nfsim_server::{
    response, InboundRequest, ListenerDef, Router, ServerLifecycle, ShutdownReport,
    ShutdownSignal,
};

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(10);

/// Binds an ephemeral loopback socket.
pub fn socket() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let (listener, addr) = socket();
    drop(listener);
    addr
}

fn server_settings() -> ServerSettings {
    ServerSettings {
        drain_timeout_secs: 2,
        ..ServerSettings::default()
    }
}

/// NF1 configuration for listeners on `api` and `nf`, notifying `remote`.
pub fn nf1_config(api: SocketAddr, nf: SocketAddr, remote: String) -> Nf1Config {
    Nf1Config {
        remote_nf_api_root: remote,
        local_api_root_prefix: "http://".to_string(),
        http: HttpConfig {
            apiendpoint: api.to_string(),
            nfendpoint: nf.to_string(),
        },
        server: server_settings(),
        ..Nf1Config::default()
    }
}

/// NF2 configuration for a listener on `nf` with the given relay delay.
pub fn nf2_config(nf: SocketAddr, delay_ms: u64) -> Nf2Config {
    Nf2Config {
        nfendpoint: nf.to_string(),
        local_api_root_prefix: "http://".to_string(),
        relay: RelaySettings { delay_ms },
        server: server_settings(),
        ..Nf2Config::default()
    }
}

/// A lifecycle running on a background task.
pub struct Running {
    pub shutdown: ShutdownSignal,
    handle: JoinHandle<ShutdownReport>,
}

impl Running {
    fn spawn(lifecycle: ServerLifecycle) -> Self {
        let shutdown = lifecycle.shutdown().clone();
        Self {
            shutdown,
            handle: tokio::spawn(lifecycle.run()),
        }
    }

    /// Triggers shutdown and waits for every listener to report.
    pub async fn stop(self) -> ShutdownReport {
        self.shutdown.trigger();
        tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("lifecycle did not stop in time")
            .unwrap()
    }
}

/// A running NF1 with its public URLs.
pub struct Nf1 {
    pub app: Nf1App,
    pub api_url: String,
    pub callback_url: String,
    pub running: Running,
}

/// Starts NF1 on fresh sockets, notifying `remote`.
pub fn start_nf1(remote: String, configure: impl FnOnce(&mut Nf1Config)) -> Nf1 {
    let (api, api_addr) = socket();
    let (nf, nf_addr) = socket();
    let mut config = nf1_config(api_addr, nf_addr, remote);
    configure(&mut config);

    let app = Nf1App::new(config).unwrap();
    let lifecycle = app
        .lifecycle(ShutdownSignal::new())
        .listeners(app.listeners_on(api, nf));

    Nf1 {
        api_url: format!("http://{api_addr}/api"),
        callback_url: app.config().callback_location(),
        app,
        running: Running::spawn(lifecycle),
    }
}

/// A running NF2 with its relay URL.
pub struct Nf2 {
    pub app: Nf2App,
    pub relay_url: String,
    pub running: Running,
}

/// Starts NF2 on a fresh socket.
pub fn start_nf2(delay_ms: u64) -> Nf2 {
    let (nf, nf_addr) = socket();
    let app = Nf2App::new(nf2_config(nf_addr, delay_ms)).unwrap();
    let lifecycle = app
        .lifecycle(ShutdownSignal::new())
        .listeners(app.listeners_on(nf));

    Nf2 {
        relay_url: format!("http://{nf_addr}/nf2"),
        app,
        running: Running::spawn(lifecycle),
    }
}

/// A stand-in peer that records every payload posted to `/nf2`.
pub struct MockPeer {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<CorrelationPayload>,
    pub running: Running,
}

/// Starts a mock peer answering every `/nf2` request with `status`.
pub fn start_mock_peer(status: StatusCode) -> MockPeer {
    let (socket, addr) = socket();
    let (tx, received) = mpsc::unbounded_channel();

    let router = Router::new().post("/nf2", move |req: InboundRequest| {
        let tx = tx.clone();
        async move {
            if let Ok(payload) = CorrelationPayload::from_json(req.body()) {
                let _ = tx.send(payload);
            }
            response::text(status, nfsim::ACKNOWLEDGEMENT)
        }
    });

    let lifecycle = ServerLifecycle::new(ShutdownSignal::new())
        .listener(ListenerDef::bound("peer", socket, router));

    MockPeer {
        url: format!("http://{addr}/nf2"),
        received,
        running: Running::spawn(lifecycle),
    }
}

/// Posts an empty body to `url`.
pub async fn post_empty(url: &str) -> reqwest::Response {
    reqwest::Client::new().post(url).send().await.unwrap()
}

/// Posts an empty body to `url` from a background task.
pub fn spawn_post(url: &str) -> JoinHandle<reqwest::Response> {
    let url = url.to_string();
    tokio::spawn(async move { post_empty(&url).await })
}
