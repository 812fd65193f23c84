//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_submissions_total` (counter): submissions by outcome
//!   (`success`, `reverted`, `rejected`, `failed`)
//! - `ledger_submission_duration_seconds` (histogram): lock-to-receipt latency
//! - `ledger_gas_fallbacks_total` (counter): estimation fallbacks by call site
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(outcome: &'static str, started: Instant) {
    metrics::counter!("ledger_submissions_total", "outcome" => outcome).increment(1);
    metrics::histogram!("ledger_submission_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_gas_fallback(site: &'static str) {
    metrics::counter!("ledger_gas_fallbacks_total", "site" => site).increment(1);
}

pub fn record_request(route: &'static str, status: u16, started: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route)
        .record(started.elapsed().as_secs_f64());
}
