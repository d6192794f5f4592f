//! Exact-path routing.
//!
//! Each route is a method plus a literal path bound to a type-erased async
//! handler. Lookups distinguish an unknown path (404) from a known path hit
//! with the wrong method (405).
//!
//! # Example
//!
//! ```rust
//! use nfsim_server::{response, Router};
//! use http::{Method, StatusCode};
//!
//! let router = Router::new()
//!     .post("/nf1", |_req| async { response::text(StatusCode::OK, "ok") });
//!
//! assert!(router.lookup(&Method::POST, "/nf1").is_found());
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::Method;

use crate::request::InboundRequest;
use crate::response::HttpResponse;

/// Boxed future returned by erased handlers.
pub type BoxedResponse = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// Type-erased handler function.
pub type ErasedHandler = Arc<dyn Fn(InboundRequest) -> BoxedResponse + Send + Sync>;

struct Route {
    method: Method,
    path: String,
    handler: ErasedHandler,
}

/// Result of a route lookup.
pub enum RouteMatch<'a> {
    /// A handler is registered for this method and path.
    Found(&'a ErasedHandler),
    /// The path exists but not for this method.
    MethodNotAllowed(Vec<Method>),
    /// No route has this path.
    NotFound,
}

impl RouteMatch<'_> {
    /// Returns `true` for [`RouteMatch::Found`].
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(_) => f.write_str("Found"),
            Self::MethodNotAllowed(allowed) => {
                f.debug_tuple("MethodNotAllowed").field(allowed).finish()
            }
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Method + path routing table.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| format!("{} {}", r.method, r.path)))
            .finish()
    }
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` on `path`, replacing any previous one.
    pub fn route<F, Fut>(mut self, method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        let path = path.into();
        let handler: ErasedHandler =
            Arc::new(move |req: InboundRequest| Box::pin(handler(req)) as BoxedResponse);
        self.routes
            .retain(|r| !(r.method == method && r.path == path));
        self.routes.push(Arc::new(Route {
            method,
            path,
            handler,
        }));
        self
    }

    /// Registers a `POST` handler.
    pub fn post<F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    /// Registers a `GET` handler.
    pub fn get<F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    /// Looks up the handler for `method` and `path`.
    pub fn lookup(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let mut allowed = Vec::new();
        for route in self.routes.iter().filter(|r| r.path == path) {
            if route.method == *method {
                return RouteMatch::Found(&route.handler);
            }
            allowed.push(route.method.clone());
        }
        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed(allowed)
        }
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}
