//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests entering a pipeline
//! - `gatekeeper_responses_total` (counter): responses by status
//! - `gatekeeper_request_duration_seconds` (histogram): pipeline latency
//! - `gatekeeper_rejections_total` (counter): gate rejections by reason
//! - `gatekeeper_faults_total` (counter): contained faults by kind
//! - `gatekeeper_tracked_clients` (gauge): buckets held by the rate limiter

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request() {
    counter!("gatekeeper_requests_total").increment(1);
}

pub fn record_response(status: u16, started: Instant) {
    counter!("gatekeeper_responses_total", "status" => status.to_string()).increment(1);
    histogram!("gatekeeper_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("gatekeeper_rejections_total", "reason" => reason).increment(1);
}

pub fn record_fault(kind: &'static str) {
    counter!("gatekeeper_faults_total", "kind" => kind).increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("gatekeeper_tracked_clients").set(count as f64);
}
