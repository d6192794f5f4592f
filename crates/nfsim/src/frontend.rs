//! The NF1 `/api` handler.
//!
//! Each request notifies the peer, then parks on the shared
//! [`NotificationGate`] until the peer's callback arrives on the NF listener.
//!
//! ```text
//! RECEIVED ──► PEER_NOTIFIED ──► AWAITING_CALLBACK ──► COMPLETED
//!     │              │                   │
//!     └──────────────┴───────────────────┴──────────► CANCELLED
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;

use nfsim_config::{HandshakeSettings, Nf1Config};
use nfsim_core::{CorrelationPayload, HandshakeError, HandshakeResult, NotificationGate};
use nfsim_server::{response, HttpResponse, InboundRequest};
use nfsim_telemetry::metrics::{record_handshake, InFlightGuard};

use crate::peer::PeerClient;

/// Progress of one `/api` handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Request accepted, peer not contacted yet.
    Received,
    /// Peer call finished.
    PeerNotified,
    /// Parked on the gate.
    AwaitingCallback,
    /// Callback consumed; the response carries its payload.
    Completed,
    /// Ended without a callback.
    Cancelled,
}

impl HandshakeState {
    /// Returns the state as an upper-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::PeerNotified => "PEER_NOTIFIED",
            Self::AwaitingCallback => "AWAITING_CALLBACK",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler for `POST /api`.
#[derive(Debug)]
pub struct ApiFrontend {
    peer: PeerClient,
    gate: Arc<NotificationGate<CorrelationPayload>>,
    remote_url: String,
    callback_location: String,
    settings: HandshakeSettings,
    in_flight: AtomicUsize,
}

impl ApiFrontend {
    /// Creates the frontend for `config`, sharing `gate` with the callback
    /// endpoint.
    pub fn new(
        config: &Nf1Config,
        peer: PeerClient,
        gate: Arc<NotificationGate<CorrelationPayload>>,
    ) -> Self {
        Self {
            peer,
            gate,
            remote_url: config.remote_nf_api_root.clone(),
            callback_location: config.callback_location(),
            settings: config.handshake.clone(),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Location advertised to the peer.
    pub fn callback_location(&self) -> &str {
        &self.callback_location
    }

    /// Number of `/api` requests currently being handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Handles one `/api` request.
    ///
    /// Responds 200 with the callback payload as JSON, or with the error
    /// envelope and the status of the [`HandshakeError`] that ended it.
    pub async fn handle(&self, req: InboundRequest) -> HttpResponse {
        let started = Instant::now();
        let _slot = self.enter();
        let _gauge = InFlightGuard::new();

        match self.handshake(&req).await {
            Ok(payload) => {
                record_handshake("completed", started.elapsed());
                response::json(StatusCode::OK, &payload)
            }
            Err(e) => {
                record_handshake(e.category(), started.elapsed());
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                response::error(status, e.category(), &e.to_string())
            }
        }
    }

    /// Runs the handshake for `req` and returns the payload of the callback
    /// that released it.
    pub async fn handshake(&self, req: &InboundRequest) -> HandshakeResult<CorrelationPayload> {
        let mut state = HandshakeState::Received;
        tracing::info!(state = %state, "handshake started");

        let notification = CorrelationPayload::now(&self.callback_location);
        let outcome = self
            .peer
            .post(&self.remote_url, &notification, req.cancelled())
            .await
            .and_then(|resp| {
                if resp.is_success() {
                    Ok(())
                } else {
                    Err(resp.into_error(&self.remote_url))
                }
            });

        if let Err(e) = outcome {
            if e.is_cancelled() || self.settings.fail_fast_on_peer_error {
                return Err(abort(state, e));
            }
            tracing::warn!(
                error = %e,
                "peer notification failed, waiting for a callback anyway"
            );
        }

        transition(&mut state, HandshakeState::PeerNotified);
        transition(&mut state, HandshakeState::AwaitingCallback);

        let wait = self.gate.wait(req.cancelled());
        let result = match self.settings.callback_timeout() {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .unwrap_or_else(|_| Err(HandshakeError::callback_timeout(limit))),
            None => wait.await,
        };

        match result {
            Ok(payload) => {
                transition(&mut state, HandshakeState::Completed);
                tracing::info!(location = %payload.location, "callback consumed");
                Ok(payload)
            }
            Err(e) => Err(abort(state, e)),
        }
    }

    fn enter(&self) -> InFlightSlot<'_> {
        let previous = self.in_flight.fetch_add(1, Ordering::AcqRel);
        if previous > 0 {
            tracing::warn!(
                in_flight = previous + 1,
                "concurrent /api requests share one callback gate; callbacks may be delivered out of order"
            );
        }
        InFlightSlot { counter: &self.in_flight }
    }
}

struct InFlightSlot<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

fn transition(state: &mut HandshakeState, next: HandshakeState) {
    tracing::info!(from = %state, state = %next, "handshake state");
    *state = next;
}

fn abort(mut state: HandshakeState, error: HandshakeError) -> HandshakeError {
    transition(&mut state, HandshakeState::Cancelled);
    tracing::warn!(
        error.category = error.category(),
        error = %error,
        "handshake ended without a callback"
    );
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use nfsim_config::{HttpConfig, PeerSettings};
    use nfsim_server::ShutdownSignal;
    use std::time::Duration;

    fn config(remote: String) -> Nf1Config {
        Nf1Config {
            remote_nf_api_root: remote,
            local_api_root_prefix: "http://localhost".to_string(),
            http: HttpConfig {
                apiendpoint: ":8081".to_string(),
                nfendpoint: ":8082".to_string(),
            },
            ..Nf1Config::default()
        }
    }

    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/nf2")
    }

    fn frontend(config: &Nf1Config) -> (ApiFrontend, Arc<NotificationGate<CorrelationPayload>>) {
        let gate = Arc::new(NotificationGate::new());
        let peer = PeerClient::new(&PeerSettings::default()).unwrap();
        (ApiFrontend::new(config, peer, gate.clone()), gate)
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(HandshakeState::Received.to_string(), "RECEIVED");
        assert_eq!(HandshakeState::AwaitingCallback.as_str(), "AWAITING_CALLBACK");
        assert_eq!(HandshakeState::Cancelled.as_str(), "CANCELLED");
    }

    #[test]
    fn test_callback_location_from_config() {
        let (frontend, _) = frontend(&config(unreachable_url()));
        assert_eq!(frontend.callback_location(), "http://localhost:8082/nf1");
    }

    #[tokio::test]
    async fn test_fail_fast_on_unreachable_peer() {
        let (frontend, gate) = frontend(&config(unreachable_url()));
        let req = InboundRequest::new(Method::POST, "/api", "");

        let resp = frontend.handle(req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(!gate.is_pending());
        assert_eq!(frontend.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_wait_anyway_when_fail_fast_disabled() {
        let mut config = config(unreachable_url());
        config.handshake.fail_fast_on_peer_error = false;
        let (frontend, gate) = frontend(&config);

        gate.signal(CorrelationPayload::new("http://localhost:9090/nf2", "t1"));
        let req = InboundRequest::new(Method::POST, "/api", "");
        let payload = frontend.handshake(&req).await.unwrap();
        assert_eq!(payload.location, "http://localhost:9090/nf2");
    }

    #[tokio::test]
    async fn test_callback_timeout() {
        let mut config = config(unreachable_url());
        config.handshake.fail_fast_on_peer_error = false;
        config.handshake.callback_timeout_secs = 1;
        let (frontend, _) = frontend(&config);

        let req = InboundRequest::new(Method::POST, "/api", "");
        let resp = tokio::time::timeout(Duration::from_secs(5), frontend.handle(req))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_wait() {
        let mut config = config(unreachable_url());
        config.handshake.fail_fast_on_peer_error = false;
        config.handshake.callback_timeout_secs = 0;
        let (frontend, gate) = frontend(&config);

        let shutdown = ShutdownSignal::new();
        let req = InboundRequest::new(Method::POST, "/api", "").with_shutdown(shutdown.clone());

        let trigger = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            shutdown.trigger();
        };
        let (resp, ()) = tokio::time::timeout(
            Duration::from_secs(5),
            async { tokio::join!(frontend.handle(req), trigger) },
        )
        .await
        .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!gate.is_pending());
    }
}
