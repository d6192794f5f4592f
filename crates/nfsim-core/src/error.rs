//! Error types for the handshake choreography.
//!
//! [`HandshakeError`] covers everything that can go wrong between an inbound
//! `/api` request and the callback that releases it. Each variant knows the
//! HTTP status it maps to and a stable category string used for log fields,
//! metric labels and the JSON error envelope.
//!
//! | Variant | Status | Category |
//! |---|---|---|
//! | `Decode` | 400 | `decode_error` |
//! | `PeerCall` | 502 | `peer_call_error` |
//! | `Cancelled` | 500 | `cancelled` |
//! | `CallbackTimeout` | 504 | `callback_timeout` |
//! | `Internal` | 500 | `internal_error` |

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`HandshakeError`].
pub type HandshakeResult<T> = Result<T, HandshakeError>;

/// Errors raised while driving or serving a handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The inbound body was not a valid correlation payload.
    #[error("invalid correlation payload: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// The outbound call to the peer failed or returned a non-2xx status.
    #[error("peer call to {url} failed: {message}")]
    PeerCall {
        /// Target URL of the outbound call.
        url: String,
        /// Status returned by the peer, if a response was received.
        status: Option<u16>,
        /// Failure description.
        message: String,
    },

    /// The waiting flow was cancelled before a callback arrived.
    #[error("handshake cancelled: {reason}")]
    Cancelled {
        /// What cancelled the wait.
        reason: String,
    },

    /// No callback arrived within the configured bound.
    #[error("no callback received within {}s", .timeout.as_secs_f64())]
    CallbackTimeout {
        /// The bound that elapsed.
        timeout: Duration,
    },

    /// Anything else.
    #[error("internal error: {message}")]
    Internal {
        /// Failure description.
        message: String,
    },
}

impl HandshakeError {
    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a peer call error.
    pub fn peer_call(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::PeerCall {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Creates a callback timeout error.
    pub fn callback_timeout(timeout: Duration) -> Self {
        Self::CallbackTimeout { timeout }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code surfaced to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Decode { .. } => 400,
            Self::PeerCall { .. } => 502,
            Self::CallbackTimeout { .. } => 504,
            Self::Cancelled { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Returns a stable category string for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode_error",
            Self::PeerCall { .. } => "peer_call_error",
            Self::Cancelled { .. } => "cancelled",
            Self::CallbackTimeout { .. } => "callback_timeout",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Returns `true` if the error came from cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl From<serde_json::Error> for HandshakeError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}
