//! A single HTTP/1.1 listener.
//!
//! Accepts connections until the shutdown signal fires, then asks every open
//! connection to finish its in-flight request, waits for connections and
//! detached work to drain, and reports how it ended.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::HeaderName;
use http::{HeaderValue, Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::ListenerError;
use crate::request::InboundRequest;
use crate::response::{self, HttpResponse};
use crate::router::{RouteMatch, Router};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Limits applied to every listener of a lifecycle.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    /// Bound on reading request headers, and separately on collecting a body.
    pub read_timeout: Duration,
    /// Largest accepted request head. Must be at least 8192.
    pub max_header_bytes: usize,
    /// How long a stopped listener waits for in-flight work.
    pub drain_timeout: Duration,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(10),
            max_header_bytes: 1 << 20,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Where a listener gets its socket from.
#[derive(Debug)]
pub enum ListenAddr {
    /// `host:port` or `:port`, bound at start.
    Configured(String),
    /// A socket the caller already bound.
    Bound(std::net::TcpListener),
}

/// One logical endpoint: a name, an address and its routes.
#[derive(Debug)]
pub struct ListenerDef {
    name: String,
    addr: ListenAddr,
    router: Router,
}

impl ListenerDef {
    /// A listener that binds `addr` when started.
    pub fn new(name: impl Into<String>, addr: impl Into<String>, router: Router) -> Self {
        Self {
            name: name.into(),
            addr: ListenAddr::Configured(addr.into()),
            router,
        }
    }

    /// A listener serving an already bound socket.
    pub fn bound(name: impl Into<String>, listener: std::net::TcpListener, router: Router) -> Self {
        Self {
            name: name.into(),
            addr: ListenAddr::Bound(listener),
            router,
        }
    }

    /// Listener name used in logs and reports.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// How a listener ended.
#[derive(Debug)]
pub enum ListenerOutcome {
    /// Stopped after shutdown.
    Closed {
        /// Connections accepted over the listener's lifetime.
        connections: u64,
        /// `false` if the drain timeout elapsed with work still running.
        drained: bool,
    },
    /// Never started.
    BindFailed(ListenerError),
}

/// Completion token a listener posts when it is done.
#[derive(Debug)]
pub struct ListenerReport {
    /// Listener name.
    pub name: String,
    /// Bound address, if binding succeeded.
    pub local_addr: Option<SocketAddr>,
    /// How it ended.
    pub outcome: ListenerOutcome,
}

impl ListenerReport {
    /// Returns `true` if the listener ran and closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.outcome, ListenerOutcome::Closed { .. })
    }
}

/// Expands `:port` to `0.0.0.0:port`.
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

async fn bind(addr: ListenAddr) -> Result<TcpListener, ListenerError> {
    match addr {
        ListenAddr::Configured(addr) => {
            let addr = normalize_addr(&addr);
            TcpListener::bind(addr.as_str())
                .await
                .map_err(|source| ListenerError::Bind { addr, source })
        }
        ListenAddr::Bound(listener) => {
            listener.set_nonblocking(true).map_err(ListenerError::Adopt)?;
            TcpListener::from_std(listener).map_err(ListenerError::Adopt)
        }
    }
}

struct ListenerContext {
    name: String,
    router: Router,
    settings: ListenerSettings,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
}

/// Runs one listener to completion.
pub(crate) async fn serve(
    def: ListenerDef,
    settings: ListenerSettings,
    shutdown: ShutdownSignal,
) -> ListenerReport {
    let ListenerDef { name, addr, router } = def;

    let listener = match bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(listener = %name, error = %e, "listener failed to start");
            return ListenerReport {
                name,
                local_addr: None,
                outcome: ListenerOutcome::BindFailed(e),
            };
        }
    };

    let local_addr = listener.local_addr().ok();
    tracing::info!(listener = %name, addr = ?local_addr, "listening");

    let ctx = Arc::new(ListenerContext {
        name,
        router,
        settings,
        shutdown: shutdown.clone(),
        tracker: ConnectionTracker::new(),
    });

    let mut connections = 0u64;
    let stop = shutdown.cancelled();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            biased;
            () = &mut stop => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, remote_addr)) => {
                        connections += 1;
                        let token = ctx.tracker.acquire();
                        let ctx = Arc::clone(&ctx);
                        tokio::spawn(async move {
                            ctx.serve_connection(stream, remote_addr).await;
                            drop(token);
                        });
                    }
                    Err(e) => {
                        tracing::warn!(listener = %ctx.name, error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }

    drop(listener);
    tracing::info!(
        listener = %ctx.name,
        active = ctx.tracker.active(),
        "stopped accepting, draining"
    );

    let drained = tokio::time::timeout(ctx.settings.drain_timeout, ctx.tracker.wait_until_idle())
        .await
        .is_ok();
    if drained {
        tracing::info!(listener = %ctx.name, connections, "listener closed");
    } else {
        tracing::warn!(
            listener = %ctx.name,
            active = ctx.tracker.active(),
            "drain timeout reached, abandoning remaining work"
        );
    }

    ListenerReport {
        name: ctx.name.clone(),
        local_addr,
        outcome: ListenerOutcome::Closed {
            connections,
            drained,
        },
    }
}

impl ListenerContext {
    async fn serve_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) {
        let io = TokioIo::new(stream);
        let ctx = Arc::clone(&self);
        let service = service_fn(move |req: Request<Incoming>| {
            let ctx = Arc::clone(&ctx);
            async move { Ok::<_, Infallible>(ctx.handle_request(req, remote_addr).await) }
        });

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.settings.read_timeout)
            .max_buf_size(self.settings.max_header_bytes);

        let conn = builder.serve_connection(io, service);
        tokio::pin!(conn);
        let stop = self.shutdown.cancelled();
        tokio::pin!(stop);

        let mut stopping = false;
        let result = loop {
            tokio::select! {
                res = conn.as_mut() => break res,
                () = &mut stop, if !stopping => {
                    stopping = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        };

        if let Err(e) = result {
            tracing::debug!(listener = %self.name, peer = %remote_addr, error = %e, "connection ended with error");
        }
    }

    async fn handle_request(&self, req: Request<Incoming>, remote_addr: SocketAddr) -> HttpResponse {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map_or_else(|| Uuid::now_v7().to_string(), str::to_string);

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
            peer = %remote_addr,
            listener = %self.name,
        );

        async move {
            let started = Instant::now();
            let mut response = self.dispatch(req).await;

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            tracing::info!(
                status = response.status().as_u16(),
                duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request completed"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, req: Request<Incoming>) -> HttpResponse {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();

        let handler = match self.router.lookup(&parts.method, &path) {
            RouteMatch::Found(handler) => Arc::clone(handler),
            RouteMatch::MethodNotAllowed(allowed) => {
                return response::method_not_allowed(&parts.method, &allowed)
            }
            RouteMatch::NotFound => return response::not_found(&path),
        };

        let body = match tokio::time::timeout(self.settings.read_timeout, body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to read request body");
                return response::error(
                    StatusCode::BAD_REQUEST,
                    "body_read_error",
                    &format!("Failed to read request body: {e}"),
                );
            }
            Err(_) => {
                tracing::warn!("request body read timed out");
                return response::error(
                    StatusCode::REQUEST_TIMEOUT,
                    "request_timeout",
                    "Request body read timed out",
                );
            }
        };

        let request = InboundRequest {
            method: parts.method,
            path,
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
            shutdown: self.shutdown.clone(),
            tracker: self.tracker.clone(),
        };
        tracing::debug!(dump = %request.dump(), "request received");

        handler(request).await
    }
}
