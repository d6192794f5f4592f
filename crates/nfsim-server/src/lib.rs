//! # NF Simulator Server
//!
//! HTTP plumbing shared by both NF roles:
//!
//! - [`ShutdownSignal`]: the process-wide cancellable context
//! - [`ConnectionTracker`]: counts connections and detached work for draining
//! - [`Router`]: exact-path routing to type-erased async handlers
//! - [`ListenerDef`]: one named HTTP/1.1 endpoint
//! - [`ServerLifecycle`]: starts N listeners and waits for all N to stop

#![doc(html_root_url = "https://docs.rs/nfsim-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod lifecycle;
mod listener;
mod request;
pub mod response;
mod router;
mod shutdown;

pub use error::ListenerError;
pub use lifecycle::{ServerLifecycle, ShutdownReport};
pub use listener::{
    normalize_addr, ListenAddr, ListenerDef, ListenerOutcome, ListenerReport, ListenerSettings,
    REQUEST_ID_HEADER,
};
pub use request::InboundRequest;
pub use response::{HttpResponse, ResponseBody};
pub use router::{BoxedResponse, ErasedHandler, RouteMatch, Router};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
