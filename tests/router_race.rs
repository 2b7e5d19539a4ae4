use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use chainrelay::error::{AttemptError, Error};
use chainrelay::rpc::{RaceRouter, RpcEndpoint};

const ATTEMPT_TIMEOUT: Duration = Duration::from_millis(500);

fn router_for(urls: &[String]) -> RaceRouter {
    let endpoints = urls
        .iter()
        .map(|url| RpcEndpoint { url: url.clone() })
        .collect();
    RaceRouter::new(endpoints, ATTEMPT_TIMEOUT)
}

fn ok_body() -> serde_json::Value {
    json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"})
}

async fn mock_rpc(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn single_healthy_endpoint_wins() {
    let server = mock_rpc(ResponseTemplate::new(200).set_body_json(ok_body())).await;
    let router = router_for(&[server.uri()]);

    let winner = router
        .race(&json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber"}))
        .await
        .unwrap();

    assert_eq!(winner.endpoint_url, server.uri());
    let body: serde_json::Value = serde_json::from_slice(&winner.body).unwrap();
    assert_eq!(body["result"], "0x10");
}

#[tokio::test]
async fn fastest_failure_does_not_win_the_race() {
    // The failing endpoint answers instantly; the healthy one is slower.
    let fast_failure = mock_rpc(ResponseTemplate::new(500)).await;
    let slow_success = mock_rpc(
        ResponseTemplate::new(200)
            .set_body_json(ok_body())
            .set_delay(Duration::from_millis(150)),
    )
    .await;
    let router = router_for(&[fast_failure.uri(), slow_success.uri()]);

    let winner = router
        .race(&json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber"}))
        .await
        .unwrap();

    assert_eq!(winner.endpoint_url, slow_success.uri());
}

#[tokio::test]
async fn json_rpc_error_envelope_loses_to_slower_valid_result() {
    // HTTP 200 carrying a JSON-RPC error must be treated as a failure.
    let rpc_error = mock_rpc(ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {"code": -32000, "message": "execution reverted"},
    })))
    .await;
    let slow_success = mock_rpc(
        ResponseTemplate::new(200)
            .set_body_json(ok_body())
            .set_delay(Duration::from_millis(150)),
    )
    .await;
    let router = router_for(&[rpc_error.uri(), slow_success.uri()]);

    let winner = router
        .race(&json!({"jsonrpc": "2.0", "id": 1, "method": "eth_call"}))
        .await
        .unwrap();

    assert_eq!(winner.endpoint_url, slow_success.uri());
}

#[tokio::test]
async fn null_result_is_a_valid_win() {
    let server = mock_rpc(
        ResponseTemplate::new(200)
            .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": null})),
    )
    .await;
    let router = router_for(&[server.uri()]);

    assert!(
        router
            .race(&json!({"jsonrpc": "2.0", "id": 1, "method": "eth_getTransactionReceipt"}))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn all_failures_carry_per_endpoint_reasons() {
    let http_error = mock_rpc(ResponseTemplate::new(502)).await;
    let not_json = mock_rpc(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
    let router = router_for(&[http_error.uri(), not_json.uri()]);

    let err = router
        .race(&json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber"}))
        .await
        .unwrap_err();

    let Error::AllEndpointsFailed(failures) = err else {
        panic!("expected AllEndpointsFailed, got {err:?}");
    };
    assert_eq!(failures.len(), 2);
    assert!(
        failures
            .iter()
            .any(|f| f.url == http_error.uri() && f.reason == AttemptError::HttpStatus(502))
    );
    assert!(
        failures
            .iter()
            .any(|f| f.url == not_json.uri() && f.reason == AttemptError::InvalidJson)
    );
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let too_slow = mock_rpc(
        ResponseTemplate::new(200)
            .set_body_json(ok_body())
            .set_delay(ATTEMPT_TIMEOUT * 4),
    )
    .await;
    let router = router_for(&[too_slow.uri()]);

    let err = router
        .race(&json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber"}))
        .await
        .unwrap_err();

    let Error::AllEndpointsFailed(failures) = err else {
        panic!("expected AllEndpointsFailed, got {err:?}");
    };
    assert_eq!(failures[0].reason, AttemptError::Timeout);
}

#[tokio::test]
async fn batch_with_an_error_element_is_an_attempt_failure() {
    let partial_error = mock_rpc(ResponseTemplate::new(200).set_body_json(json!([
        {"jsonrpc": "2.0", "id": 1, "result": "0x1"},
        {"jsonrpc": "2.0", "id": 2, "error": {"code": -32601, "message": "method not found"}},
    ])))
    .await;
    let router = router_for(&[partial_error.uri()]);

    let err = router
        .race(&json!([
            {"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber"},
            {"jsonrpc": "2.0", "id": 2, "method": "eth_call"},
        ]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AllEndpointsFailed(_)));
}

#[tokio::test]
async fn cancellation_aborts_in_flight_attempts() {
    let slow = mock_rpc(
        ResponseTemplate::new(200)
            .set_body_json(ok_body())
            .set_delay(Duration::from_millis(400)),
    )
    .await;
    let router = router_for(&[slow.uri()]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = router
        .race_with_cancel(
            &json!({"jsonrpc": "2.0", "id": 1, "method": "eth_blockNumber"}),
            cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RaceCancelled));
}
