//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by outcome, status
//! - `proxy_request_duration_seconds` (histogram): latency by outcome
//! - `proxy_rewritten_references_total` (counter): references redirected through the proxy
//! - `proxy_skipped_references_total` (counter): references left as-is after a resolution failure
//!
//! Outcomes: `html`, `passthrough`, `rejected`, `upstream_error`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rewrite(rewritten: usize, skipped: usize) {
    ::metrics::counter!("proxy_rewritten_references_total").increment(rewritten as u64);
    ::metrics::counter!("proxy_skipped_references_total").increment(skipped as u64);
}
