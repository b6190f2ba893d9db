//! Validates and performs one proxied call.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use url::{Host, Url};

use crate::observability::metrics;
use crate::proxy::guard::{is_blocked_host_literal, is_private_ip, HostResolver};
use crate::proxy::transport::{OutboundRequest, Transport, TransportError, UpstreamResponse};
use crate::records::{LogWriter, OutboundExchange};

const BODY_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

/// A proxy request as the client described it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyCall {
    pub endpoint: Option<String>,
    pub method: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub payload: String,
    /// Milliseconds; `None` or zero means the configured default.
    pub timeout_ms: Option<u64>,
    /// Explicit identifier for the log filename.
    pub log_identifier: Option<String>,
    /// `id` query parameter of the request that asked for this call.
    pub query_id: Option<String>,
}

/// Upstream reply handed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOutcome {
    pub status: u16,
    pub headers: String,
    pub body: String,
}

impl From<UpstreamResponse> for ProxyOutcome {
    fn from(response: UpstreamResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("Endpoint and method are required for proxy requests.")]
    MissingFields,

    #[error("Invalid endpoint URL.")]
    InvalidUrl,

    #[error("Invalid endpoint URL: missing host.")]
    MissingHost,

    #[error("Access to internal network denied.")]
    InternalNetwork,

    /// The call was attempted and failed; reported to clients with status 0.
    #[error("Request failed: {0}")]
    Upstream(String),
}

/// Runs proxy calls through validation, the egress guard, the transport,
/// and the log writer.
#[derive(Clone)]
pub struct ProxyExecutor {
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn HostResolver>,
    log_writer: Arc<LogWriter>,
    default_timeout: Duration,
    /// Upper bound for any per-call timeout, kept under the server's
    /// request deadline so a slow upstream is still logged and answered.
    timeout_cap: Option<Duration>,
}

impl ProxyExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn HostResolver>,
        log_writer: Arc<LogWriter>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            resolver,
            log_writer,
            default_timeout,
            timeout_cap: None,
        }
    }

    pub fn with_timeout_cap(mut self, cap: Duration) -> Self {
        self.timeout_cap = Some(cap);
        self
    }

    fn effective_timeout(&self, requested_ms: Option<u64>) -> Duration {
        let timeout = requested_ms
            .filter(|ms| *ms > 0)
            .map_or(self.default_timeout, Duration::from_millis);
        match self.timeout_cap {
            Some(cap) => timeout.min(cap),
            None => timeout,
        }
    }

    pub async fn execute(&self, call: ProxyCall) -> Result<ProxyOutcome, ProxyError> {
        // 1. Required fields
        let (endpoint, method) = match (non_blank(&call.endpoint), non_blank(&call.method)) {
            (Some(e), Some(m)) => (e.to_string(), m.to_ascii_uppercase()),
            _ => return Err(ProxyError::MissingFields),
        };

        // 2-3. Well-formed absolute URL with a host
        let url = Url::parse(&endpoint).map_err(|_| ProxyError::InvalidUrl)?;
        if url.host().is_none() {
            return Err(ProxyError::MissingHost);
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidUrl);
        }

        // 4. Egress guard
        self.check_egress(&url).await?;

        // 5. Call
        let body = (BODY_METHODS.contains(&method.as_str()) && !call.payload.is_empty())
            .then(|| call.payload.clone());
        let timeout = self.effective_timeout(call.timeout_ms);

        let request = OutboundRequest {
            method: method.clone(),
            url,
            headers: call.headers.clone(),
            body,
            timeout,
        };

        let start = Instant::now();
        tracing::info!(method = %method, endpoint = %endpoint, timeout_ms = timeout.as_millis() as u64, "Proxying request");

        // Enforced here as well so no transport can outlive the deadline
        let sent = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Failed(format!(
                "Operation timed out after {} milliseconds",
                timeout.as_millis()
            ))),
        };

        match sent {
            Ok(response) => {
                metrics::record_proxy_request(&method, response.status, start);
                tracing::info!(
                    method = %method,
                    endpoint = %endpoint,
                    status = response.status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                self.record(&call, &endpoint, &method, response.status, &response.headers, &response.body)
                    .await;
                Ok(response.into())
            }
            Err(e) => {
                let message = e.to_string();
                metrics::record_proxy_request(&method, 0, start);
                tracing::warn!(method = %method, endpoint = %endpoint, error = %message, "Upstream request failed");
                self.record(&call, &endpoint, &method, 0, "", &format!("cURL Error: {}", message))
                    .await;
                Err(ProxyError::Upstream(message))
            }
        }
    }

    /// Literal host check first, then every resolved address. A failed
    /// lookup is left for the transport to report.
    async fn check_egress(&self, url: &Url) -> Result<(), ProxyError> {
        let addresses: Vec<IpAddr> = match url.host() {
            Some(Host::Domain(domain)) => {
                if is_blocked_host_literal(domain) {
                    return Err(self.deny(domain, "host_literal"));
                }
                match self.resolver.resolve(domain).await {
                    Ok(addresses) => addresses,
                    Err(e) => {
                        tracing::debug!(host = %domain, error = %e, "Host did not resolve");
                        Vec::new()
                    }
                }
            }
            Some(Host::Ipv4(ip)) => vec![IpAddr::V4(ip)],
            Some(Host::Ipv6(ip)) => vec![IpAddr::V6(ip)],
            None => return Err(ProxyError::MissingHost),
        };

        let host = url.host_str().unwrap_or_default();
        if addresses.iter().any(|ip| ip.is_unspecified()) {
            return Err(self.deny(host, "host_literal"));
        }
        if addresses.iter().any(|ip| is_private_ip(*ip)) {
            return Err(self.deny(host, "private_address"));
        }
        Ok(())
    }

    fn deny(&self, host: &str, reason: &'static str) -> ProxyError {
        metrics::record_ssrf_blocked(reason);
        tracing::warn!(host = %host, reason, "Blocked proxy request to internal network");
        ProxyError::InternalNetwork
    }

    /// Best-effort outbound record, written on the blocking pool.
    async fn record(&self, call: &ProxyCall, endpoint: &str, method: &str, status: u16, headers: &str, body: &str) {
        let writer = self.log_writer.clone();
        let call = call.clone();
        let endpoint = endpoint.to_string();
        let method = method.to_string();
        let headers = headers.to_string();
        let body = body.to_string();

        let written = tokio::task::spawn_blocking(move || {
            let exchange = OutboundExchange {
                endpoint: &endpoint,
                method: &method,
                headers: &call.headers,
                payload: &call.payload,
                status,
                response_headers: &headers,
                response_body: &body,
            };
            writer
                .log_outbound(&exchange, call.log_identifier.as_deref(), call.query_id.as_deref())
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
        .unwrap_or_else(|e| Err(e.to_string()));

        if let Err(e) = written {
            metrics::record_log_write_failure("outbound");
            tracing::warn!(error = %e, "Failed to write outbound log record");
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{list_logs, read_log};
    use futures_util::future::{BoxFuture, FutureExt};
    use std::io;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every request and replies with a canned result.
    struct FakeTransport {
        reply: Result<UpstreamResponse, TransportError>,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl FakeTransport {
        fn ok(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(UpstreamResponse {
                    status,
                    headers: format!("HTTP/1.1 {} X\r\n\r\n", status),
                    body: body.to_string(),
                }),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(TransportError::Failed(message.to_string())),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<OutboundRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<UpstreamResponse, TransportError>> {
            self.seen.lock().unwrap().push(request);
            let reply = self.reply.clone();
            async move { reply }.boxed()
        }
    }

    struct StaticResolver(Vec<IpAddr>);

    impl HostResolver for StaticResolver {
        fn resolve<'a>(&'a self, _host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>> {
            let addrs = self.0.clone();
            async move { Ok(addrs) }.boxed()
        }
    }

    fn executor(dir: &TempDir, transport: Arc<FakeTransport>, resolved: &str) -> ProxyExecutor {
        ProxyExecutor::new(
            transport,
            Arc::new(StaticResolver(vec![resolved.parse().unwrap()])),
            Arc::new(LogWriter::new(dir.path(), "http://localhost:8080/")),
            Duration::from_millis(30_000),
        )
    }

    fn call(endpoint: &str, method: &str) -> ProxyCall {
        ProxyCall {
            endpoint: Some(endpoint.to_string()),
            method: Some(method.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_validation_order() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::ok(200, "");
        let exec = executor(&dir, transport.clone(), "93.184.216.34");

        let missing = ProxyCall { method: Some("GET".into()), ..Default::default() };
        assert_eq!(exec.execute(missing).await, Err(ProxyError::MissingFields));
        assert_eq!(exec.execute(call("http://example.com", "  ")).await, Err(ProxyError::MissingFields));
        assert_eq!(exec.execute(call("not a url", "GET")).await, Err(ProxyError::InvalidUrl));
        assert_eq!(exec.execute(call("mailto:someone@example.com", "GET")).await, Err(ProxyError::MissingHost));
        assert_eq!(exec.execute(call("ftp://example.com/file", "GET")).await, Err(ProxyError::InvalidUrl));

        assert!(transport.calls().is_empty());
        assert!(list_logs(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loopback_literal_blocked_before_network() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::ok(200, "");
        let exec = executor(&dir, transport.clone(), "93.184.216.34");

        for endpoint in [
            "http://127.0.0.1/x",
            "http://localhost:3000/",
            "http://[::1]/",
            "http://0.0.0.0/",
            "http://nas.local/",
            "https://vault.internal/secret",
            "http://169.254.169.254/latest/meta-data",
        ] {
            assert_eq!(
                exec.execute(call(endpoint, "GET")).await,
                Err(ProxyError::InternalNetwork),
                "{}",
                endpoint
            );
        }
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolved_private_address_blocked() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::ok(200, "");
        let exec = executor(&dir, transport.clone(), "192.168.0.10");

        assert_eq!(
            exec.execute(call("http://innocent.example.com/", "GET")).await,
            Err(ProxyError::InternalNetwork)
        );
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_success_logs_one_outbound_record() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::ok(201, "{\"id\":1}");
        let exec = executor(&dir, transport.clone(), "93.184.216.34");

        let outcome = exec.execute(call("http://example.com", "get")).await.unwrap();
        assert_eq!(outcome.status, 201);
        assert_eq!(outcome.body, "{\"id\":1}");
        assert_eq!(outcome.headers, "HTTP/1.1 201 X\r\n\r\n");

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].body, None);
        assert_eq!(calls[0].timeout, Duration::from_millis(30_000));

        let logs = list_logs(dir.path()).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].starts_with("example_"));
        let record = read_log(dir.path(), &logs[0]).unwrap();
        assert_eq!(record["type"], "outbound");
        assert_eq!(record["response"]["status"], 201);
    }

    #[tokio::test]
    async fn test_body_only_for_body_methods() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::ok(200, "");
        let exec = executor(&dir, transport.clone(), "93.184.216.34");

        for method in ["POST", "PUT", "PATCH", "GET", "DELETE"] {
            let mut c = call("https://api.example.com/items", method);
            c.payload = "{\"x\":1}".into();
            c.timeout_ms = Some(1500);
            exec.execute(c).await.unwrap();
        }
        let mut empty = call("https://api.example.com/items", "POST");
        empty.timeout_ms = Some(0);
        exec.execute(empty).await.unwrap();

        let calls = transport.calls();
        let bodies: Vec<bool> = calls.iter().map(|c| c.body.is_some()).collect();
        assert_eq!(bodies, vec![true, true, true, false, false, false]);
        assert_eq!(calls[0].timeout, Duration::from_millis(1500));
        assert_eq!(calls[5].timeout, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_transport_failure_logged_with_status_zero() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::failing("Could not resolve host: nowhere.example");
        let exec = executor(&dir, transport, "93.184.216.34");

        let mut c = call("https://nowhere.example/", "POST");
        c.log_identifier = Some("nightly check".into());
        let err = exec.execute(c).await.unwrap_err();
        assert_eq!(err, ProxyError::Upstream("Could not resolve host: nowhere.example".into()));
        assert_eq!(err.to_string(), "Request failed: Could not resolve host: nowhere.example");

        let logs = list_logs(dir.path()).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].starts_with("nightlycheck_"));
        let record = read_log(dir.path(), &logs[0]).unwrap();
        assert_eq!(record["response"]["status"], 0);
        assert_eq!(record["response"]["headers"], "");
        assert_eq!(
            record["response"]["body"],
            "cURL Error: Could not resolve host: nowhere.example"
        );
    }

    #[tokio::test]
    async fn test_query_id_names_the_log() {
        let dir = TempDir::new().unwrap();
        let exec = executor(&dir, FakeTransport::ok(200, ""), "93.184.216.34");

        let mut c = call("https://api.example.com/", "GET");
        c.query_id = Some("from-query".into());
        exec.execute(c).await.unwrap();

        assert!(list_logs(dir.path()).unwrap()[0].starts_with("from-query_"));
    }

    struct StalledTransport;

    impl Transport for StalledTransport {
        fn send(&self, _request: OutboundRequest) -> BoxFuture<'_, Result<UpstreamResponse, TransportError>> {
            async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Err(TransportError::Failed("too late".into()))
            }
            .boxed()
        }
    }

    #[test]
    fn test_timeout_cap_bounds_requested_timeout() {
        let dir = TempDir::new().unwrap();
        let exec = executor(&dir, FakeTransport::ok(200, ""), "93.184.216.34")
            .with_timeout_cap(Duration::from_millis(500));

        assert_eq!(exec.effective_timeout(Some(5_000)), Duration::from_millis(500));
        assert_eq!(exec.effective_timeout(Some(200)), Duration::from_millis(200));
        assert_eq!(exec.effective_timeout(None), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_stalled_upstream_times_out_and_is_logged() {
        let dir = TempDir::new().unwrap();
        let exec = ProxyExecutor::new(
            Arc::new(StalledTransport),
            Arc::new(StaticResolver(vec!["93.184.216.34".parse().unwrap()])),
            Arc::new(LogWriter::new(dir.path(), "http://localhost:8080/")),
            Duration::from_millis(500),
        )
        .with_timeout_cap(Duration::from_millis(500));

        let mut c = call("https://slow.example.com/", "GET");
        c.timeout_ms = Some(5_000);
        let err = exec.execute(c).await.unwrap_err();
        assert_eq!(
            err,
            ProxyError::Upstream("Operation timed out after 500 milliseconds".into())
        );

        let logs = list_logs(dir.path()).unwrap();
        assert_eq!(logs.len(), 1);
        let record = read_log(dir.path(), &logs[0]).unwrap();
        assert_eq!(record["response"]["status"], 0);
        assert_eq!(
            record["response"]["body"],
            "cURL Error: Operation timed out after 500 milliseconds"
        );
    }
}
