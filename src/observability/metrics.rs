//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): dispatched requests by outcome, status
//!   (`none` for abandoned requests)
//! - `router_request_duration_seconds` (histogram): dispatch latency by outcome
//! - `router_faults_total` (counter): faults by kind

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::dispatch::{FaultKind, Outcome};

/// Install the Prometheus recorder and serve it on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a dispatch that produced a response.
pub fn record_dispatch(outcome: Outcome, status: StatusCode, started: Instant) {
    record(outcome, status.as_u16().to_string(), started);
}

/// Record a dispatch dropped before any response existed.
pub fn record_abandoned(started: Instant) {
    record(Outcome::Abandoned, "none".to_string(), started);
}

fn record(outcome: Outcome, status: String, started: Instant) {
    let outcome = outcome.as_str();
    counter!("router_requests_total", "outcome" => outcome, "status" => status).increment(1);
    histogram!("router_request_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

/// Record a fault as it is raised.
pub fn record_fault(kind: FaultKind) {
    counter!("router_faults_total", "kind" => kind.as_str()).increment(1);
}
