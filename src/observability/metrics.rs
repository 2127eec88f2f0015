//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by method, route, status
//! - `router_request_errors_total` (counter): errored requests by method, route
//! - `router_request_duration_seconds` (histogram): latency by method, route
//! - `router_route_conflicts_total` (counter): registration conflicts by kind, severity
//!
//! # Design Decisions
//! - Labels use the registered route path, never the concrete URL, to keep
//!   cardinality bounded
//! - Updates go through the `metrics` facade and are no-ops until a recorder
//!   is installed

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::analytics::RequestMetadata;
use crate::routing::{ConflictKind, Severity};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe();
            tracing::info!(address = %addr, "Prometheus metrics endpoint started");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install Prometheus recorder");
        }
    }
}

fn describe() {
    metrics::describe_counter!("router_requests_total", "Completed requests per route");
    metrics::describe_counter!("router_request_errors_total", "Errored requests per route");
    metrics::describe_histogram!(
        "router_request_duration_seconds",
        metrics::Unit::Seconds,
        "Request latency per route"
    );
    metrics::describe_counter!(
        "router_route_conflicts_total",
        "Route conflicts found at registration"
    );
}

/// Mirror one completed request.
pub fn record_request(meta: &RequestMetadata) {
    let method = meta.method.clone();
    let route = meta.path.clone();

    metrics::counter!(
        "router_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => meta.status_code.to_string()
    )
    .increment(1);

    if meta.is_error() {
        metrics::counter!(
            "router_request_errors_total",
            "method" => method.clone(),
            "route" => route.clone()
        )
        .increment(1);
    }

    metrics::histogram!(
        "router_request_duration_seconds",
        "method" => method,
        "route" => route
    )
    .record(meta.duration_ms / 1000.0);
}

pub fn record_conflict(kind: ConflictKind, severity: Severity) {
    metrics::counter!(
        "router_route_conflicts_total",
        "kind" => kind.as_str(),
        "severity" => severity.as_str()
    )
    .increment(1);
}
