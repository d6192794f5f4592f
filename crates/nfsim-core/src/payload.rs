//! The correlation payload exchanged between NF roles.

use crate::error::{HandshakeError, HandshakeResult};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// "Where to call me back" plus a liveness timestamp.
///
/// Serialized as `{"location": "...", "time": "..."}`. `location` is
/// required on decode, `time` defaults to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationPayload {
    /// Callback URL of the sender.
    pub location: String,
    /// Timestamp taken when the payload was built.
    #[serde(default)]
    pub time: String,
}

impl CorrelationPayload {
    /// Creates a payload from its parts.
    pub fn new(location: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            time: time.into(),
        }
    }

    /// Creates a payload stamped with the current UTC time.
    pub fn now(location: impl Into<String>) -> Self {
        Self::new(
            location,
            Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        )
    }

    /// Decodes a payload from a request body.
    ///
    /// An empty body is a decode error, as is any JSON that lacks `location`.
    pub fn from_json(body: &[u8]) -> HandshakeResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(HandshakeError::decode("empty body"));
        }
        Ok(serde_json::from_slice(body)?)
    }

    /// Encodes the payload as JSON bytes.
    pub fn to_json(&self) -> HandshakeResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| HandshakeError::internal(e.to_string()))
    }
}
