//! reqwest transport against local mock backends.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use api_tester::proxy::{OutboundRequest, ReqwestTransport, Transport, TransportError};
use common::{http_response, start_mock_backend, start_programmable_backend};
use url::Url;

fn request(method: &str, url: String, body: Option<&str>, timeout: Duration) -> OutboundRequest {
    OutboundRequest {
        method: method.to_string(),
        url: Url::parse(&url).unwrap(),
        headers: BTreeMap::new(),
        body: body.map(str::to_string),
        timeout,
    }
}

#[tokio::test]
async fn test_raw_header_block_and_body() {
    let addr = start_mock_backend("201 Created", &[("X-Upstream", "yes")], "{\"id\":7}").await;
    let transport = ReqwestTransport::new(10).unwrap();

    let response = transport
        .send(request("GET", format!("http://{}/items", addr), None, Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert!(response.headers.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(response.headers.contains("x-upstream: yes\r\n"));
    assert!(response.headers.ends_with("\r\n\r\n"));
    assert_eq!(response.body, "{\"id\":7}");
}

#[tokio::test]
async fn test_body_and_headers_reach_upstream() {
    let addr = start_programmable_backend(|req| async move {
        let echo = format!("{}|{}", req.request_line(), req.body);
        http_response("200 OK", &[], &echo)
    })
    .await;
    let transport = ReqwestTransport::new(10).unwrap();

    let mut outbound = request("PUT", format!("http://{}/v1/thing", addr), Some("{\"a\":1}"), Duration::from_secs(5));
    outbound.headers.insert("X-Custom".into(), "value".into());

    let response = transport.send(outbound).await.unwrap();
    assert_eq!(response.body, "PUT /v1/thing HTTP/1.1|{\"a\":1}");
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let addr = start_mock_backend("503 Service Unavailable", &[], "down").await;
    let transport = ReqwestTransport::new(10).unwrap();

    let response = transport
        .send(request("GET", format!("http://{}/", addr), None, Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(response.body, "down");
}

#[tokio::test]
async fn test_redirect_into_private_network_is_refused() {
    let addr = start_mock_backend("302 Found", &[("Location", "http://10.0.0.1/admin")], "").await;
    let transport = ReqwestTransport::new(10).unwrap();

    let result = transport
        .send(request("GET", format!("http://{}/", addr), None, Duration::from_secs(5)))
        .await;

    match result {
        Err(TransportError::Failed(message)) => {
            assert!(message.contains("internal network access denied"), "{}", message)
        }
        other => panic!("expected refusal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_limit() {
    let addr = start_mock_backend("302 Found", &[("Location", "http://93.184.216.34/")], "").await;
    let transport = ReqwestTransport::new(0).unwrap();

    let result = transport
        .send(request("GET", format!("http://{}/", addr), None, Duration::from_secs(5)))
        .await;

    match result {
        Err(TransportError::Failed(message)) => assert!(message.contains("maximum of 0 redirects"), "{}", message),
        other => panic!("expected redirect limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_message() {
    let addr = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        http_response("200 OK", &[], "late")
    })
    .await;
    let transport = ReqwestTransport::new(10).unwrap();

    let result = transport
        .send(request("GET", format!("http://{}/", addr), None, Duration::from_millis(200)))
        .await;

    assert_eq!(
        result,
        Err(TransportError::Failed("Operation timed out after 200 milliseconds".into()))
    );
}
