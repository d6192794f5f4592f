//! The NF2 `/nf2` handler.
//!
//! The sender is acknowledged at once. The reply is posted from a detached
//! task after the configured delay, unless the server shuts down first.

use std::time::Duration;

use http::StatusCode;
use tracing::Instrument;

use nfsim_config::Nf2Config;
use nfsim_core::{CorrelationPayload, HandshakeError, HandshakeResult};
use nfsim_server::{response, HttpResponse, InboundRequest};
use nfsim_telemetry::metrics::record_relay;

use crate::peer::PeerClient;
use crate::ACKNOWLEDGEMENT;

/// Handler for `POST /nf2`.
#[derive(Debug, Clone)]
pub struct DelayedRelay {
    peer: PeerClient,
    reply_location: String,
    delay: Duration,
}

impl DelayedRelay {
    /// Creates the relay for `config`.
    pub fn new(config: &Nf2Config, peer: PeerClient) -> Self {
        Self {
            peer,
            reply_location: config.reply_location(),
            delay: config.relay.delay(),
        }
    }

    /// Location advertised in every reply.
    pub fn reply_location(&self) -> &str {
        &self.reply_location
    }

    /// Delay before the reply is sent.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Handles one forwarded request.
    pub async fn handle(&self, req: InboundRequest) -> HttpResponse {
        let incoming = match CorrelationPayload::from_json(req.body()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "relay body rejected");
                record_relay("rejected");
                return response::error(StatusCode::BAD_REQUEST, e.category(), &e.to_string());
            }
        };

        // Registered with the listener so shutdown drains the pending reply.
        let token = req.hold();
        let cancel = req.cancelled();
        let relay = self.clone();

        tokio::spawn(
            async move {
                let _token = token;
                if let Err(e) = relay.reply(incoming, cancel).await {
                    tracing::info!(error.category = e.category(), error = %e, "relay ended without a reply");
                }
            }
            .instrument(tracing::Span::current()),
        );

        response::text(StatusCode::OK, ACKNOWLEDGEMENT)
    }

    /// Waits out the delay, then posts a reply to `incoming.location`.
    ///
    /// Returns without sending anything if `cancel` resolves first.
    pub async fn reply<F>(&self, incoming: CorrelationPayload, cancel: F) -> HandshakeResult<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        tokio::pin!(cancel);

        tokio::select! {
            biased;
            () = &mut cancel => {
                tracing::info!(target_location = %incoming.location, "relay abandoned before the delay elapsed");
                record_relay("cancelled");
                return Err(HandshakeError::cancelled("relay abandoned on shutdown"));
            }
            () = tokio::time::sleep(self.delay) => {}
        }

        let reply = CorrelationPayload::now(&self.reply_location);
        tracing::info!(target_location = %incoming.location, "sending relay reply");

        match self.peer.post(&incoming.location, &reply, cancel).await {
            Ok(resp) if resp.is_success() => {
                record_relay("sent");
                Ok(())
            }
            Ok(resp) => {
                record_relay("failed");
                let err = resp.into_error(&incoming.location);
                tracing::warn!(error = %err, "relay reply rejected by peer");
                Err(err)
            }
            Err(e) if e.is_cancelled() => {
                record_relay("cancelled");
                Err(e)
            }
            Err(e) => {
                record_relay("failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use nfsim_config::{PeerSettings, RelaySettings};
    use nfsim_server::ConnectionTracker;

    fn relay(delay_ms: u64) -> DelayedRelay {
        let config = Nf2Config {
            nfendpoint: ":9090".to_string(),
            local_api_root_prefix: "http://localhost".to_string(),
            relay: RelaySettings { delay_ms },
            ..Nf2Config::default()
        };
        DelayedRelay::new(&config, PeerClient::new(&PeerSettings::default()).unwrap())
    }

    #[test]
    fn test_reply_location() {
        let relay = relay(1000);
        assert_eq!(relay.reply_location(), "http://localhost:9090/nf2");
        assert_eq!(relay.delay(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected_without_relay() {
        let relay = relay(0);
        let tracker = ConnectionTracker::new();

        let req = InboundRequest::new(Method::POST, "/nf2", "{").with_tracker(tracker.clone());
        let resp = relay.handle(req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(tracker.active(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_delay_sends_nothing() {
        let relay = relay(60_000);
        let incoming = CorrelationPayload::new("http://127.0.0.1:9/nf1", "t1");

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            relay.reply(incoming, tokio::time::sleep(Duration::from_millis(50))),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_accepted_request_holds_tracker_until_done() {
        let relay = relay(60_000);
        let tracker = ConnectionTracker::new();
        let shutdown = nfsim_server::ShutdownSignal::new();

        let req = InboundRequest::new(
            Method::POST,
            "/nf2",
            r#"{"location":"http://127.0.0.1:9/nf1","time":"t1"}"#,
        )
        .with_tracker(tracker.clone())
        .with_shutdown(shutdown.clone());
        let resp = relay.handle(req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(tracker.active(), 1);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), tracker.wait_until_idle())
            .await
            .unwrap();
    }
}
