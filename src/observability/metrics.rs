//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fund_actions_total` (counter): actions by kind and outcome
//! - `fund_action_duration_seconds` (histogram): end-to-end action latency
//! - `aggregator_requests_total` (counter): aggregator calls by endpoint and status
//! - `rpc_failover_total` (counter): RPC calls that fell through to the next provider
//! - `bookkeeping_failures_total` (counter): best-effort records that failed

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_action(action: &str, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "fund_actions_total",
        "action" => action.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("fund_action_duration_seconds", "action" => action.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_aggregator_request(endpoint: &'static str, status: u16) {
    metrics::counter!(
        "aggregator_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_rpc_failover(operation: &'static str) {
    metrics::counter!("rpc_failover_total", "operation" => operation).increment(1);
}

pub fn record_bookkeeping_failure(kind: &str) {
    metrics::counter!("bookkeeping_failures_total", "kind" => kind.to_string()).increment(1);
}
