//! Concurrent per-route analytics store.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::analytics::types::{
    now_millis, AnalyticsExport, AnalyticsSummary, RequestMetadata, RouteAnalyticsData, RouteStats,
};

/// Cap applied to the ranked lists in `summary()`.
pub const SUMMARY_TOP_N: usize = 10;

type AnalyticsKey = (String, String);

/// Request statistics keyed by (method, route path).
///
/// Each record is updated under its map entry lock, so concurrent requests
/// to the same route never interleave inside one update. Totals are derived
/// from the records on every query, which keeps them consistent with
/// `clear_route`.
#[derive(Debug)]
pub struct RouteAnalytics {
    routes: DashMap<AnalyticsKey, RouteAnalyticsData>,
    started: Instant,
    started_at: u64,
}

impl Default for RouteAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteAnalytics {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
            started: Instant::now(),
            started_at: now_millis(),
        }
    }

    /// Fold a completed request into its route record, creating it on first use.
    pub fn record_request(&self, meta: RequestMetadata) {
        let key = (meta.method.clone(), meta.path.clone());
        self.routes
            .entry(key)
            .or_insert_with(|| RouteAnalyticsData::new(meta.method.clone(), meta.path.clone()))
            .record(&meta);
    }

    pub fn route(&self, method: &str, path: &str) -> Option<RouteAnalyticsData> {
        self.routes
            .get(&(method.to_string(), path.to_string()))
            .map(|r| r.value().clone())
    }

    /// Snapshot of all records, sorted by path then method.
    pub fn routes(&self) -> Vec<RouteAnalyticsData> {
        let mut routes: Vec<_> = self.routes.iter().map(|r| r.value().clone()).collect();
        routes.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));
        routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let routes = self.routes();
        let total_requests: u64 = routes.iter().map(|r| r.request_count).sum();
        let total_errors: u64 = routes.iter().map(|r| r.error_count).sum();
        let total_duration: f64 = routes.iter().map(|r| r.total_duration_ms).sum();
        let uptime_secs = self.uptime().as_secs_f64();

        AnalyticsSummary {
            total_routes: routes.len(),
            total_requests,
            total_errors,
            error_rate: ratio(total_errors as f64, total_requests as f64),
            avg_response_time_ms: ratio(total_duration, total_requests as f64),
            requests_per_second: ratio(total_requests as f64, uptime_secs),
            top_routes: rank(&routes, SUMMARY_TOP_N, |_| true, by_request_count),
            slowest_routes: rank(&routes, SUMMARY_TOP_N, RouteAnalyticsData::has_data, by_avg_duration),
            error_prone_routes: rank(&routes, SUMMARY_TOP_N, has_errors, by_error_count),
        }
    }

    /// Routes with the highest average duration.
    pub fn slowest_routes(&self, n: usize) -> Vec<RouteStats> {
        rank(&self.routes(), n, RouteAnalyticsData::has_data, by_avg_duration)
    }

    pub fn most_accessed_routes(&self, n: usize) -> Vec<RouteStats> {
        rank(&self.routes(), n, |_| true, by_request_count)
    }

    /// Routes with at least one error, ranked by error rate rather than raw
    /// error count.
    pub fn error_prone_routes(&self, n: usize) -> Vec<RouteStats> {
        rank(&self.routes(), n, has_errors, by_error_rate)
    }

    /// Routes not accessed within `threshold`.
    pub fn stale_routes(&self, threshold: Duration) -> Vec<RouteStats> {
        let cutoff = now_millis().saturating_sub(threshold.as_millis() as u64);
        self.routes()
            .iter()
            .filter(|r| r.last_accessed.is_some_and(|last| last < cutoff))
            .map(RouteAnalyticsData::stats)
            .collect()
    }

    pub fn clear(&self) {
        self.routes.clear();
    }

    /// Drop one route's record. Returns false if it was never recorded.
    pub fn clear_route(&self, method: &str, path: &str) -> bool {
        self.routes
            .remove(&(method.to_string(), path.to_string()))
            .is_some()
    }

    pub fn export(&self) -> AnalyticsExport {
        AnalyticsExport {
            timestamp: now_millis(),
            uptime_ms: self.uptime().as_millis() as u64,
            summary: self.summary(),
            routes: self.routes().iter().map(RouteAnalyticsData::stats).collect(),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn has_errors(route: &RouteAnalyticsData) -> bool {
    route.error_count > 0
}

fn by_request_count(a: &RouteAnalyticsData, b: &RouteAnalyticsData) -> Ordering {
    b.request_count.cmp(&a.request_count)
}

fn by_avg_duration(a: &RouteAnalyticsData, b: &RouteAnalyticsData) -> Ordering {
    b.avg_duration_ms.total_cmp(&a.avg_duration_ms)
}

fn by_error_count(a: &RouteAnalyticsData, b: &RouteAnalyticsData) -> Ordering {
    b.error_count.cmp(&a.error_count)
}

fn by_error_rate(a: &RouteAnalyticsData, b: &RouteAnalyticsData) -> Ordering {
    b.error_rate()
        .total_cmp(&a.error_rate())
        .then_with(|| by_error_count(a, b))
}

/// Filter, stable-sort and truncate. Input is already in path order, so ties
/// stay deterministic.
fn rank<F, C>(routes: &[RouteAnalyticsData], n: usize, keep: F, order: C) -> Vec<RouteStats>
where
    F: Fn(&RouteAnalyticsData) -> bool,
    C: Fn(&RouteAnalyticsData, &RouteAnalyticsData) -> Ordering,
{
    let mut kept: Vec<&RouteAnalyticsData> = routes.iter().filter(|r| keep(*r)).collect();
    kept.sort_by(|a, b| order(*a, *b));
    kept.into_iter().take(n).map(RouteAnalyticsData::stats).collect()
}
