//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_tester_captures_total` (counter): webhook calls captured
//! - `api_tester_captured_requests` (gauge): ring buffer length after a capture
//! - `api_tester_responses_total` (counter): catcher replies by source (default/template)
//! - `api_tester_proxy_requests_total` (counter): proxied calls by method, status
//! - `api_tester_proxy_duration_seconds` (histogram): proxied call latency
//! - `api_tester_ssrf_blocked_total` (counter): refused proxy targets by reason
//! - `api_tester_log_write_failures_total` (counter): dropped exchange records by direction

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_capture(buffer_len: usize) {
    counter!("api_tester_captures_total").increment(1);
    gauge!("api_tester_captured_requests").set(buffer_len as f64);
}

pub fn record_catcher_reply(source: &'static str) {
    counter!("api_tester_responses_total", "source" => source).increment(1);
}

pub fn record_proxy_request(method: &str, status: u16, start: Instant) {
    counter!(
        "api_tester_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("api_tester_proxy_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_ssrf_blocked(reason: &'static str) {
    counter!("api_tester_ssrf_blocked_total", "reason" => reason).increment(1);
}

pub fn record_log_write_failure(direction: &'static str) {
    counter!("api_tester_log_write_failures_total", "direction" => direction).increment(1);
}
