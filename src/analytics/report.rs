//! Human-readable analytics reports.
//!
//! Routes that have never completed a request report `no data` for their
//! durations instead of a numeric placeholder.

use std::fmt::Write;

use crate::analytics::types::{AnalyticsExport, RouteStats};

pub const NO_DATA: &str = "no data";

pub fn format_duration(duration_ms: Option<f64>) -> String {
    match duration_ms {
        Some(ms) if ms.is_finite() => format!("{:.2}ms", ms),
        _ => NO_DATA.to_string(),
    }
}

/// One line per route: method, path, counts and latency spread.
pub fn route_line(stats: &RouteStats) -> String {
    format!(
        "{:<7} {:<40} requests={:<6} errors={:<5} ({:.1}%) min={} avg={} max={}",
        stats.method,
        stats.path,
        stats.request_count,
        stats.error_count,
        stats.error_rate * 100.0,
        format_duration(stats.min_duration_ms),
        format_duration(stats.avg_duration_ms),
        format_duration(stats.max_duration_ms),
    )
}

/// Multi-line report of an export snapshot.
pub fn render(export: &AnalyticsExport) -> String {
    let summary = &export.summary;
    let mut out = String::new();
    let _ = writeln!(out, "--- Route Analytics ---");
    let _ = writeln!(out, "Uptime:          {:.1}s", export.uptime_ms as f64 / 1000.0);
    let _ = writeln!(out, "Routes:          {}", summary.total_routes);
    let _ = writeln!(out, "Total Requests:  {}", summary.total_requests);
    let _ = writeln!(
        out,
        "Total Errors:    {} ({:.1}%)",
        summary.total_errors,
        summary.error_rate * 100.0
    );
    let avg = (summary.total_requests > 0).then_some(summary.avg_response_time_ms);
    let _ = writeln!(out, "Avg Response:    {}", format_duration(avg));
    let _ = writeln!(out, "Requests/sec:    {:.2}", summary.requests_per_second);
    for route in &export.routes {
        let _ = writeln!(out, "{}", route_line(route));
    }
    let _ = writeln!(out, "-----------------------");
    out
}
