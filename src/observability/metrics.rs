//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): dispatched requests by surface, verb, status, action kind
//! - `dispatch_duration_seconds` (histogram): time from routing to a filled-in response
//! - `socket_channels` (gauge): bound socket channels
//! - `socket_pushes_total` (counter): messages produced by push actions
//!
//! # Design Decisions
//! - Macros are no-ops until a recorder is installed, so the engine records
//!   unconditionally and tests need no setup
//! - The Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to build metrics exporter: {0}")]
    Build(String),
}

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    describe_counter!("dispatch_requests_total", "Requests dispatched by the engine");
    describe_histogram!("dispatch_duration_seconds", "Time spent dispatching one request");
    describe_gauge!("socket_channels", "Currently bound socket channels");
    describe_counter!("socket_pushes_total", "Messages produced by push actions");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_dispatch(surface: &'static str, verb: &'static str, status: u16, action: &'static str, start: Instant) {
    let labels = [
        ("surface", surface.to_string()),
        ("verb", verb.to_string()),
        ("status", status.to_string()),
        ("action", action.to_string()),
    ];
    counter!("dispatch_requests_total", &labels).increment(1);
    histogram!("dispatch_duration_seconds", "surface" => surface).record(start.elapsed().as_secs_f64());
}

pub fn record_channel_bound() {
    gauge!("socket_channels").increment(1.0);
}

pub fn record_channel_unbound() {
    gauge!("socket_channels").decrement(1.0);
}

pub fn record_push(path: &str) {
    counter!("socket_pushes_total", "path" => path.to_string()).increment(1);
}
