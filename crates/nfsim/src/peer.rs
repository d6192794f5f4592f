//! Outbound HTTP client for calls to the peer NF.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, CONTENT_TYPE};
use http::StatusCode;
use reqwest::Client;

use nfsim_config::PeerSettings;
use nfsim_core::{CorrelationPayload, HandshakeError, HandshakeResult};
use nfsim_telemetry::metrics::record_peer_request;

/// Client that posts [`CorrelationPayload`]s to a peer.
///
/// One client is built per role at startup and shared by every handler, so
/// connections to the peer are pooled.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client,
    timeout: Duration,
}

impl PeerClient {
    /// Builds a client with the configured timeout and `User-Agent`.
    pub fn new(settings: &PeerSettings) -> HandshakeResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| HandshakeError::internal(format!("failed to create peer client: {e}")))?;

        Ok(Self {
            client,
            timeout: settings.timeout(),
        })
    }

    /// Overall timeout applied to each call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Posts `payload` as JSON to `url`.
    ///
    /// The call is abandoned as soon as `cancel` resolves. Any response,
    /// whatever its status, is returned with its body read to completion;
    /// only transport failures and cancellation are errors.
    pub async fn post<F>(
        &self,
        url: &str,
        payload: &CorrelationPayload,
        cancel: F,
    ) -> HandshakeResult<PeerResponse>
    where
        F: Future<Output = ()>,
    {
        let body = payload.to_json()?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        let call = async move {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(PeerResponse {
                status,
                headers,
                body,
            })
        };

        tracing::info!(url = %url, location = %payload.location, "sending request to peer");

        let result = tokio::select! {
            biased;
            () = cancel => {
                tracing::info!(url = %url, "peer call cancelled");
                return Err(HandshakeError::cancelled("peer call was cancelled"));
            }
            result = call => result,
        };

        match result {
            Ok(response) => {
                record_peer_request(Some(response.status.as_u16()));
                response.log();
                Ok(response)
            }
            Err(e) => {
                record_peer_request(None);
                tracing::warn!(url = %url, error = %e, "peer call failed");
                Err(HandshakeError::peer_call(
                    url,
                    e.status().map(|s| s.as_u16()),
                    e.to_string(),
                ))
            }
        }
    }
}

/// Response received from the peer.
#[derive(Debug, Clone)]
pub struct PeerResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body, fully read.
    pub body: Bytes,
}

impl PeerResponse {
    /// Check if the response is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the body as a string (lossy).
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts a non-2xx response into a peer call error for `url`.
    pub fn into_error(self, url: &str) -> HandshakeError {
        let message = format!("peer answered {}: {}", self.status, self.body_string());
        HandshakeError::peer_call(url, Some(self.status.as_u16()), message)
    }

    fn log(&self) {
        tracing::info!(status = self.status.as_u16(), "headers in the peer response");
        for (name, value) in &self.headers {
            tracing::info!(header = %name, value = ?value, "peer response header");
        }
        tracing::info!(body = %self.body_string(), "body in the peer response");
    }
}
