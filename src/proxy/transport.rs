//! HTTP transport for proxied calls.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, Method, Response};
use thiserror::Error;
use url::Url;

use crate::proxy::guard::{url_host_is_blocked, GuardedDnsResolver, InternalAddress};

/// One call ready to go on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: String,
    pub url: Url,
    /// Applied verbatim.
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout: Duration,
}

/// What came back from upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Raw header block: status line, `name: value` lines, blank line.
    pub headers: String,
    pub body: String,
}

/// The call never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Failed(String),
}

pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<UpstreamResponse, TransportError>>;
}

/// reqwest-backed transport that follows redirects through the egress guard.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

#[derive(Debug, Error)]
#[error("maximum of {0} redirects exceeded")]
struct TooManyRedirects(usize);

impl ReqwestTransport {
    pub fn new(max_redirects: usize) -> Result<Self, TransportError> {
        // `previous` starts with the original URL, so it holds one more
        // entry than the number of redirects followed so far.
        let policy = Policy::custom(move |attempt: Attempt<'_>| {
            if attempt.previous().len() > max_redirects {
                return attempt.error(TooManyRedirects(max_redirects));
            }
            if url_host_is_blocked(attempt.url()) {
                let host = attempt.url().host_str().unwrap_or_default().to_string();
                tracing::warn!(host = %host, "Refusing redirect into internal network");
                return attempt.error(InternalAddress(host));
            }
            attempt.follow()
        });

        let client = Client::builder()
            .redirect(policy)
            .dns_resolver(Arc::new(GuardedDnsResolver))
            .no_proxy()
            .build()
            .map_err(|e| TransportError::InvalidRequest(error_chain(&e)))?;

        Ok(Self { client })
    }

    async fn execute(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::InvalidRequest(format!("invalid method '{}'", request.method)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidRequest(format!("invalid header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidRequest(format!("invalid value for header '{}'", name)))?;
            headers.append(name, value);
        }

        let mut builder = self
            .client
            .request(method, request.url)
            .headers(headers)
            .timeout(request.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Failed(describe(&e, request.timeout)))?;

        let status = response.status().as_u16();
        let header_block = raw_header_block(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Failed(describe(&e, request.timeout)))?;

        Ok(UpstreamResponse {
            status,
            headers: header_block,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Result<UpstreamResponse, TransportError>> {
        self.execute(request).boxed()
    }
}

/// `HTTP/1.1 200 OK\r\nname: value\r\n...\r\n\r\n`
fn raw_header_block(response: &Response) -> String {
    let mut block = format!("{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        block.push_str(name.as_str());
        block.push_str(": ");
        block.push_str(&String::from_utf8_lossy(value.as_bytes()));
        block.push_str("\r\n");
    }
    block.push_str("\r\n");
    block
}

fn describe(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        return format!("Operation timed out after {} milliseconds", timeout.as_millis());
    }
    error_chain(error)
}

/// `outer: inner: innermost`, skipping repeated messages.
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
