//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_tester::config::AppConfig;
use api_tester::proxy::{HostResolver, OutboundRequest, Transport, TransportError, UpstreamResponse};
use futures_util::future::BoxFuture;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Config whose storage lives under `dir`.
pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.log_directory = dir.path().join("logs");
    config.storage.data_directory = dir.path().join("data");
    config
}

/// A received request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub head: String,
    pub body: String,
}

impl RawRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }
}

/// Start a mock backend on an ephemeral port. `f` maps each request to a
/// raw HTTP response.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RawRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = String> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let response = f(request).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Mock backend returning the same response to every request.
pub async fn start_mock_backend(status_line: &'static str, headers: &'static [(&'static str, &'static str)], body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { http_response(status_line, headers, body) }).await
}

pub fn http_response(status_line: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status_line, body.len());
    for (name, value) in headers {
        response.push_str(&format!("{}: {}\r\n", name, value));
    }
    response.push_str("\r\n");
    response.push_str(body);
    response
}

async fn read_request(socket: &mut TcpStream) -> Option<RawRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[head_end..]).into_owned();
    Some(RawRequest { head, body })
}

/// Resolves every name to one fixed address.
pub struct StaticResolver(pub IpAddr);

impl StaticResolver {
    pub fn public() -> Self {
        Self(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)))
    }
}

impl HostResolver for StaticResolver {
    fn resolve<'a>(&'a self, _host: &'a str) -> BoxFuture<'a, std::io::Result<Vec<IpAddr>>> {
        let ip = self.0;
        Box::pin(async move { Ok(vec![ip]) })
    }
}

/// In-memory transport that records what it was asked to send.
pub struct FakeTransport {
    reply: Result<UpstreamResponse, TransportError>,
    delay: Option<Duration>,
    pub sent: Mutex<Vec<OutboundRequest>>,
}

impl FakeTransport {
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            reply: Ok(UpstreamResponse {
                status,
                headers: format!("HTTP/1.1 {}\r\ncontent-type: application/json\r\n\r\n", status),
                body: body.to_string(),
            }),
            delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(TransportError::Failed(message.to_string())),
            delay: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Fails with `message`, but only after `delay`, ignoring the timeout
    /// it was given.
    pub fn stalling(delay: Duration, message: &str) -> Self {
        Self {
            delay: Some(delay),
            ..Self::failing(message)
        }
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<UpstreamResponse, TransportError>> {
        self.sent.lock().unwrap().push(request);
        let reply = self.reply.clone();
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            reply
        })
    }
}
