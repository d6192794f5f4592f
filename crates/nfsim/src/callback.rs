//! The NF1 callback handler.

use std::sync::Arc;

use http::StatusCode;

use nfsim_core::{CorrelationPayload, NotificationGate};
use nfsim_server::{response, HttpResponse, InboundRequest};
use nfsim_telemetry::metrics::record_callback;

use crate::ACKNOWLEDGEMENT;

/// Handler for the callback route (`/nf1` unless configured otherwise).
///
/// A well-formed payload is handed to the gate and acknowledged; anything
/// else is rejected with 400 and leaves the gate untouched.
#[derive(Debug, Clone)]
pub struct CallbackEndpoint {
    gate: Arc<NotificationGate<CorrelationPayload>>,
}

impl CallbackEndpoint {
    /// Creates the endpoint on top of the gate the frontend waits on.
    pub fn new(gate: Arc<NotificationGate<CorrelationPayload>>) -> Self {
        Self { gate }
    }

    /// Handles one callback.
    pub async fn handle(&self, req: InboundRequest) -> HttpResponse {
        let payload = match CorrelationPayload::from_json(req.body()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "callback body rejected");
                record_callback("rejected");
                return response::error(StatusCode::BAD_REQUEST, e.category(), &e.to_string());
            }
        };

        tracing::info!(location = %payload.location, time = %payload.time, "callback accepted");
        if let Some(stale) = self.gate.signal(payload) {
            tracing::warn!(
                location = %stale.location,
                "replaced a callback no handshake had consumed yet"
            );
        }
        record_callback("accepted");

        response::text(StatusCode::OK, ACKNOWLEDGEMENT)
    }
}
