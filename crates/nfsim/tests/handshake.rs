//! End-to-end handshake scenarios over real listeners.

mod common;

use std::time::{Duration, Instant};

use http::StatusCode;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use common::{closed_addr, post_empty, spawn_post, start_mock_peer, start_nf1, start_nf2, WAIT};
use nfsim::ACKNOWLEDGEMENT;
use nfsim_core::CorrelationPayload;

#[tokio::test]
async fn test_api_completes_through_relay() {
    let nf2 = start_nf2(100);
    let nf1 = start_nf1(nf2.relay_url.clone(), |_| {});

    let res = tokio::time::timeout(WAIT, post_empty(&nf1.api_url))
        .await
        .expect("/api did not complete");
    assert_eq!(res.status(), StatusCode::OK);

    let payload: CorrelationPayload = res.json().await.unwrap();
    assert_eq!(payload.location, nf2.app.config().reply_location());
    assert_eq!(payload.location, nf2.relay_url);
    assert!(!payload.time.is_empty());
    assert!(!nf1.app.gate().is_pending());

    assert!(nf1.running.stop().await.all_closed());
    assert!(nf2.running.stop().await.all_closed());
}

#[tokio::test]
async fn test_relay_acknowledges_before_replying() {
    let mut peer = start_mock_peer(StatusCode::OK);
    let nf2 = start_nf2(500);

    let started = Instant::now();
    let res = reqwest::Client::new()
        .post(&nf2.relay_url)
        .json(&CorrelationPayload::new(peer.url.clone(), "t0"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), ACKNOWLEDGEMENT);
    assert!(started.elapsed() < Duration::from_millis(500));

    let reply = tokio::time::timeout(WAIT, peer.received.recv())
        .await
        .expect("relay reply not received")
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(reply.location, nf2.relay_url);
    assert_ne!(reply.time, "t0");

    nf2.running.stop().await;
    peer.running.stop().await;
}

#[tokio::test]
async fn test_relay_rejects_malformed_body() {
    let nf2 = start_nf2(0);
    let client = reqwest::Client::new();

    for body in ["", "{", r#"{"time":"t0"}"#] {
        let res = client.post(&nf2.relay_url).body(body).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    nf2.running.stop().await;
}

#[tokio::test]
async fn test_malformed_callback_does_not_release_api() {
    let mut peer = start_mock_peer(StatusCode::OK);
    let nf1 = start_nf1(peer.url.clone(), |c| c.handshake.callback_timeout_secs = 0);

    let api = spawn_post(&nf1.api_url);
    let notification = tokio::time::timeout(WAIT, peer.received.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.location, nf1.callback_url);

    let client = reqwest::Client::new();
    let res = client.post(&nf1.callback_url).body("not json").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!api.is_finished());

    let res = client
        .post(&nf1.callback_url)
        .json(&CorrelationPayload::new("http://peer.example/nf2", "t1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), ACKNOWLEDGEMENT);

    let res = tokio::time::timeout(WAIT, api).await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let payload: CorrelationPayload = res.json().await.unwrap();
    assert_eq!(payload, CorrelationPayload::new("http://peer.example/nf2", "t1"));

    nf1.running.stop().await;
    peer.running.stop().await;
}

#[tokio::test]
async fn test_client_disconnect_releases_wait() {
    let mut peer = start_mock_peer(StatusCode::OK);
    let nf1 = start_nf1(peer.url.clone(), |c| c.handshake.callback_timeout_secs = 0);

    let api_addr = nf1
        .api_url
        .trim_start_matches("http://")
        .trim_end_matches("/api")
        .to_string();
    let mut stream = TcpStream::connect(&api_addr).await.unwrap();
    stream
        .write_all(b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
        .await
        .unwrap();
    tokio::time::timeout(WAIT, peer.received.recv()).await.unwrap().unwrap();

    drop(stream);
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Nobody is waiting any more, so the callback stays in the slot.
    let res = reqwest::Client::new()
        .post(&nf1.callback_url)
        .json(&CorrelationPayload::new("http://peer.example/nf2", "t1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(nf1.app.gate().is_pending());

    nf1.running.stop().await;
    peer.running.stop().await;
}

#[tokio::test]
async fn test_peer_error_fails_fast() {
    let peer = start_mock_peer(StatusCode::SERVICE_UNAVAILABLE);
    let nf1 = start_nf1(peer.url.clone(), |_| {});

    let res = tokio::time::timeout(WAIT, post_empty(&nf1.api_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "peer_call_error");

    nf1.running.stop().await;
    peer.running.stop().await;
}

#[tokio::test]
async fn test_unreachable_peer_fails_fast() {
    let nf1 = start_nf1(format!("http://{}/nf2", closed_addr()), |_| {});

    let res = tokio::time::timeout(WAIT, post_empty(&nf1.api_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    nf1.running.stop().await;
}

#[tokio::test]
async fn test_peer_error_tolerated_when_fail_fast_disabled() {
    let mut peer = start_mock_peer(StatusCode::SERVICE_UNAVAILABLE);
    let nf1 = start_nf1(peer.url.clone(), |c| c.handshake.fail_fast_on_peer_error = false);

    let api = spawn_post(&nf1.api_url);
    tokio::time::timeout(WAIT, peer.received.recv()).await.unwrap().unwrap();

    let res = reqwest::Client::new()
        .post(&nf1.callback_url)
        .json(&CorrelationPayload::new("http://peer.example/nf2", "t2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = tokio::time::timeout(WAIT, api).await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    nf1.running.stop().await;
    peer.running.stop().await;
}

#[tokio::test]
async fn test_callback_timeout() {
    let peer = start_mock_peer(StatusCode::OK);
    let nf1 = start_nf1(peer.url.clone(), |c| c.handshake.callback_timeout_secs = 1);

    let started = Instant::now();
    let res = tokio::time::timeout(WAIT, post_empty(&nf1.api_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() >= Duration::from_secs(1));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "callback_timeout");

    nf1.running.stop().await;
    peer.running.stop().await;
}

#[tokio::test]
async fn test_metrics_route_without_recorder() {
    let nf2 = start_nf2(0);
    let metrics_url = nf2.relay_url.replace("/nf2", "/metrics");

    let res = reqwest::Client::new().get(&metrics_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "metrics_disabled");

    nf2.running.stop().await;
}
