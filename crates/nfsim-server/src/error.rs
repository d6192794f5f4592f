//! Listener error types.

use std::io;
use thiserror::Error;

/// Errors a listener can hit while starting.
///
/// These are reported in the listener's
/// [`ListenerReport`](crate::ListenerReport) and logged; they are never
/// returned from [`ServerLifecycle::run`](crate::ServerLifecycle::run).
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Binding the configured address failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address as configured.
        addr: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A pre-bound listener could not be handed to the runtime.
    #[error("failed to adopt pre-bound listener: {0}")]
    Adopt(#[source] io::Error),
}
