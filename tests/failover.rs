//! End-to-end failover tests against real sockets.

use flate2::{write::GzEncoder, Compression};
use std::io::Write;
use std::time::Duration;

mod common;

use common::{
    client, closed_port, gateway_config, start_gateway, start_mock_backend,
    start_programmable_backend, target, Reply,
};

const CALL: &str = r#"{"jsonrpc":"2.0","id":7,"method":"eth_chainId","params":[]}"#;

#[tokio::test]
async fn test_fails_over_to_next_target() {
    let a = start_mock_backend(Reply::new(500, "boom").header("x-backend", "a")).await;
    let b = start_mock_backend(Reply::new(200, r#"{"result":"0x1"}"#).header("x-backend", "b")).await;
    let c = start_mock_backend(Reply::new(200, "c")).await;

    let gateway = start_gateway(gateway_config(
        vec![target("a", &a.url()), target("b", &b.url()), target("c", &c.url())],
        1000,
    ))
    .await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-backend"], "b");
    assert_eq!(res.text().await.unwrap(), r#"{"result":"0x1"}"#);
    assert_eq!(a.hits(), 1);
    assert_eq!(b.hits(), 1);
    assert_eq!(c.hits(), 0, "targets after the winner must not be contacted");
}

#[tokio::test]
async fn test_all_rate_limited_returns_service_unavailable() {
    let a = start_mock_backend(Reply::new(429, "slow down")).await;
    let b = start_mock_backend(Reply::new(429, "slow down")).await;

    let gateway = start_gateway(gateway_config(
        vec![target("a", &a.url()), target("b", &b.url())],
        1000,
    ))
    .await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "Service Unavailable\n");
    assert_eq!(a.hits(), 1);
    assert_eq!(b.hits(), 1);
}

#[tokio::test]
async fn test_client_error_is_committed() {
    let a = start_mock_backend(Reply::new(400, "bad params")).await;
    let b = start_mock_backend(Reply::new(200, "ok")).await;

    let gateway = start_gateway(gateway_config(
        vec![target("a", &a.url()), target("b", &b.url())],
        1000,
    ))
    .await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.text().await.unwrap(), "bad params");
    assert_eq!(b.hits(), 0);
}

#[tokio::test]
async fn test_slow_target_times_out_and_body_is_replayed() {
    let a = start_mock_backend(Reply::new(200, "late").delayed(Duration::from_millis(600))).await;
    let b = start_mock_backend(Reply::new(200, "fast")).await;

    let gateway = start_gateway(gateway_config(
        vec![target("a", &a.url()), target("b", &b.url())],
        100,
    ))
    .await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "fast");
    assert_eq!(a.bodies(), vec![CALL.as_bytes().to_vec()]);
    assert_eq!(b.bodies(), vec![CALL.as_bytes().to_vec()]);
}

#[tokio::test]
async fn test_unreachable_target_is_skipped() {
    let dead = closed_port().await;
    let b = start_mock_backend(Reply::new(200, "alive")).await;

    let gateway = start_gateway(gateway_config(
        vec![target("dead", &format!("http://{dead}/")), target("b", &b.url())],
        1000,
    ))
    .await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "alive");
}

#[tokio::test]
async fn test_path_and_query_are_forwarded() {
    let a = start_programmable_backend(|_| async { Reply::new(200, "ok") }).await;
    let url = format!("http://{}/v3/key", a.addr);

    let gateway = start_gateway(gateway_config(vec![target("a", &url)], 1000)).await;

    let res = client()
        .post(gateway.url("/extra?trace=1"))
        .body(CALL)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(a.uris(), vec!["/v3/key/extra?trace=1".to_string()]);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let a = start_mock_backend(Reply::new(200, "ok")).await;
    let gateway = start_gateway(gateway_config(vec![target("a", &a.url())], 1000)).await;

    let res = client()
        .post(gateway.url("/"))
        .header("x-request-id", "req-42")
        .body(CALL)
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-42");

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_gzip_body_is_inflated_for_plain_target() {
    let a = start_mock_backend(Reply::new(200, "ok")).await;
    let gateway = start_gateway(gateway_config(vec![target("a", &a.url())], 1000)).await;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(CALL.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let res = client()
        .post(gateway.url("/"))
        .header("content-encoding", "gzip")
        .body(compressed)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(a.bodies(), vec![CALL.as_bytes().to_vec()]);
    assert!(a.headers()[0].get("content-encoding").is_none());
}

#[tokio::test]
async fn test_reload_swaps_targets() {
    let old = start_mock_backend(Reply::new(200, "old")).await;
    let new = start_mock_backend(Reply::new(200, "new")).await;

    let gateway = start_gateway(gateway_config(vec![target("old", &old.url())], 1000)).await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "old");

    gateway
        .reload
        .send(gateway_config(vec![target("new", &new.url())], 1000))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "new");
    assert_eq!(old.hits(), 1);
}

#[tokio::test]
async fn test_every_attempt_is_recorded() {
    let a = start_mock_backend(Reply::new(502, "down")).await;
    let b = start_mock_backend(Reply::new(200, "ok")).await;

    let gateway = start_gateway(gateway_config(
        vec![target("a", &a.url()), target("b", &b.url())],
        1000,
    ))
    .await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let rendered = gateway.metrics.render();
    assert!(rendered.contains("rpc_gateway_target_response_status_total"));
    assert!(rendered.contains(r#"status_code="502""#));
    assert!(rendered.contains(r#"status_code="200""#));
    assert!(rendered.contains(r#"type="rerouted""#));
    assert!(rendered.contains("rpc_gateway_request_duration_seconds"));
}

#[tokio::test]
async fn test_target_is_not_retried_within_a_request() {
    let a = start_programmable_backend(|hit| async move {
        if hit == 0 {
            Reply::new(503, "warming up")
        } else {
            Reply::new(200, "ready")
        }
    })
    .await;

    let gateway = start_gateway(gateway_config(vec![target("a", &a.url())], 1000)).await;

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(a.hits(), 1);

    let res = client().post(gateway.url("/")).body(CALL).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "ready");
}
