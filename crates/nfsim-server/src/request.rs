//! The request as handlers see it.

use std::fmt::Write as _;
use std::future::Future;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};

/// A fully collected inbound request plus the listener context it arrived on.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) tracker: ConnectionTracker,
}

impl InboundRequest {
    /// Builds a request outside a listener, for driving handlers directly.
    pub fn new(method: Method, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: body.into(),
            shutdown: ShutdownSignal::new(),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Replaces the shutdown signal the request observes.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Replaces the tracker detached work registers with.
    pub fn with_tracker(mut self, tracker: ConnectionTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Collected request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The process-wide shutdown signal.
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Owned future completing when the serving context is cancelled.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        self.shutdown.cancelled()
    }

    /// Registers detached work with the listener so shutdown waits for it.
    pub fn hold(&self) -> ConnectionToken {
        self.tracker.acquire()
    }

    /// Renders the request the way a wire dump reads, for debug logs.
    pub fn dump(&self) -> String {
        let mut out = format!("{} {}", self.method, self.path);
        if let Some(query) = &self.query {
            let _ = write!(out, "?{query}");
        }
        for (name, value) in &self.headers {
            let _ = write!(
                out,
                "\n{}: {}",
                name,
                value.to_str().unwrap_or("<binary>")
            );
        }
        if !self.body.is_empty() {
            let _ = write!(out, "\n\n{}", String::from_utf8_lossy(&self.body));
        }
        out
    }
}
