//! Metrics collection.
//!
//! # Metrics
//! - `file_router_requests_total` (counter): requests by method, status, route
//! - `file_router_request_duration_seconds` (histogram): dispatch latency
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; installing an exporter is up to the host
//! - Unmatched requests use the route label `none`

use std::time::Instant;

pub const REQUESTS_TOTAL: &str = "file_router_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "file_router_request_duration_seconds";

/// Records one dispatched request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    let route = route.to_string();

    ::metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "status" => status.clone(),
        "route" => route.clone()
    )
    .increment(1);
    ::metrics::histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method,
        "status" => status,
        "route" => route
    )
    .record(start.elapsed().as_secs_f64());
}
