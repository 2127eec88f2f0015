//! Analytics records and snapshot types.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Outcome of one completed request, consumed by `RouteAnalytics`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetadata {
    pub method: String,
    /// Route path as registered, not the concrete request path.
    pub path: String,
    pub status_code: u16,
    pub duration_ms: f64,
    /// Completion time, epoch milliseconds.
    pub timestamp: u64,
    /// Set when the request failed regardless of status code.
    pub error: bool,
}

impl RequestMetadata {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        duration: Duration,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status_code,
            duration_ms: duration.as_secs_f64() * 1000.0,
            timestamp: now_millis(),
            error: false,
        }
    }

    pub fn with_error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Errors are flagged requests and any 4xx/5xx response.
    pub fn is_error(&self) -> bool {
        self.error || self.status_code >= 400
    }
}

/// Running counters for one (method, path).
#[derive(Debug, Clone, PartialEq)]
pub struct RouteAnalyticsData {
    pub method: String,
    pub path: String,
    pub request_count: u64,
    pub error_count: u64,
    pub total_duration_ms: f64,
    /// `f64::INFINITY` until the first request; read through `min_duration_ms()`.
    pub min_duration_ms: f64,
    pub max_duration_ms: f64,
    pub avg_duration_ms: f64,
    pub status_codes: BTreeMap<u16, u64>,
    pub first_accessed: Option<u64>,
    pub last_accessed: Option<u64>,
}

impl RouteAnalyticsData {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            request_count: 0,
            error_count: 0,
            total_duration_ms: 0.0,
            min_duration_ms: f64::INFINITY,
            max_duration_ms: 0.0,
            avg_duration_ms: 0.0,
            status_codes: BTreeMap::new(),
            first_accessed: None,
            last_accessed: None,
        }
    }

    /// Fold one request into the counters.
    pub fn record(&mut self, meta: &RequestMetadata) {
        self.request_count += 1;
        if meta.is_error() {
            self.error_count += 1;
        }
        // `clamp` below panics on NaN bounds.
        let duration_ms = if meta.duration_ms.is_finite() {
            meta.duration_ms.max(0.0)
        } else {
            0.0
        };
        self.total_duration_ms += duration_ms;
        self.min_duration_ms = self.min_duration_ms.min(duration_ms);
        self.max_duration_ms = self.max_duration_ms.max(duration_ms);
        // The running f64 sum can drift past the extremes.
        self.avg_duration_ms = (self.total_duration_ms / self.request_count as f64)
            .clamp(self.min_duration_ms, self.max_duration_ms);
        *self.status_codes.entry(meta.status_code).or_insert(0) += 1;
        self.first_accessed.get_or_insert(meta.timestamp);
        self.last_accessed = Some(meta.timestamp);
    }

    /// Fraction of requests that errored, in `0.0..=1.0`.
    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.request_count as f64
        }
    }

    pub fn min_duration_ms(&self) -> Option<f64> {
        self.has_data().then_some(self.min_duration_ms)
    }

    pub fn max_duration_ms(&self) -> Option<f64> {
        self.has_data().then_some(self.max_duration_ms)
    }

    pub fn avg_duration_ms(&self) -> Option<f64> {
        self.has_data().then_some(self.avg_duration_ms)
    }

    pub fn has_data(&self) -> bool {
        self.request_count > 0
    }

    pub fn stats(&self) -> RouteStats {
        RouteStats {
            method: self.method.clone(),
            path: self.path.clone(),
            request_count: self.request_count,
            error_count: self.error_count,
            error_rate: self.error_rate(),
            total_duration_ms: self.total_duration_ms,
            min_duration_ms: self.min_duration_ms(),
            avg_duration_ms: self.avg_duration_ms(),
            max_duration_ms: self.max_duration_ms(),
            status_codes: self.status_codes.clone(),
            first_accessed: self.first_accessed,
            last_accessed: self.last_accessed,
        }
    }
}

/// Reporting view of a route's counters.
///
/// Durations are `None` for a route that has never completed a request, so
/// the infinite minimum never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    pub method: String,
    pub path: String,
    pub request_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub total_duration_ms: f64,
    pub min_duration_ms: Option<f64>,
    pub avg_duration_ms: Option<f64>,
    pub max_duration_ms: Option<f64>,
    pub status_codes: BTreeMap<u16, u64>,
    pub first_accessed: Option<u64>,
    pub last_accessed: Option<u64>,
}

/// Aggregate view across all routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_routes: usize,
    pub total_requests: u64,
    pub total_errors: u64,
    /// `total_errors / total_requests`.
    pub error_rate: f64,
    /// Total duration over total requests across all routes. Weighted by
    /// request, not an average of the per-route averages.
    pub avg_response_time_ms: f64,
    pub requests_per_second: f64,
    pub top_routes: Vec<RouteStats>,
    pub slowest_routes: Vec<RouteStats>,
    pub error_prone_routes: Vec<RouteStats>,
}

/// Point-in-time snapshot for external emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsExport {
    pub timestamp: u64,
    pub uptime_ms: u64,
    pub summary: AnalyticsSummary,
    pub routes: Vec<RouteStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(status: u16, duration_ms: f64) -> RequestMetadata {
        RequestMetadata::new("GET", "/x", status, Duration::ZERO).with_duration_ms(duration_ms)
    }

    #[test]
    fn test_record_arithmetic() {
        let mut data = RouteAnalyticsData::new("GET", "/x");
        data.record(&meta(200, 10.0));
        data.record(&meta(200, 20.0));
        data.record(&meta(500, 30.0));

        assert_eq!(data.request_count, 3);
        assert_eq!(data.error_count, 1);
        assert_eq!(data.min_duration_ms, 10.0);
        assert_eq!(data.max_duration_ms, 30.0);
        assert_eq!(data.avg_duration_ms, 20.0);
        assert_eq!(data.status_codes, BTreeMap::from([(200, 2), (500, 1)]));
        assert_eq!(data.status_codes.values().sum::<u64>(), data.request_count);
    }

    #[test]
    fn test_error_flag_counts_without_error_status() {
        let mut data = RouteAnalyticsData::new("GET", "/x");
        data.record(&meta(200, 1.0).with_error(true));
        assert_eq!(data.error_count, 1);
    }

    #[test]
    fn test_first_accessed_set_once() {
        let mut data = RouteAnalyticsData::new("GET", "/x");
        data.record(&meta(200, 1.0).at(1_000));
        data.record(&meta(200, 1.0).at(2_000));
        assert_eq!(data.first_accessed, Some(1_000));
        assert_eq!(data.last_accessed, Some(2_000));
    }

    #[test]
    fn test_empty_route_has_no_durations() {
        let data = RouteAnalyticsData::new("GET", "/never");
        assert!(data.min_duration_ms.is_infinite());

        let stats = data.stats();
        assert_eq!(stats.min_duration_ms, None);
        assert_eq!(stats.avg_duration_ms, None);
        assert_eq!(stats.error_rate, 0.0);

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["min_duration_ms"].is_null());
    }

    #[test]
    fn test_ordering_invariant() {
        let mut data = RouteAnalyticsData::new("GET", "/x");
        for d in [5.0, 1.0, 9.0, 3.0] {
            data.record(&meta(200, d));
            let (min, avg, max) = (
                data.min_duration_ms().unwrap(),
                data.avg_duration_ms().unwrap(),
                data.max_duration_ms().unwrap(),
            );
            assert!(min <= avg && avg <= max);
        }
    }

    #[test]
    fn test_equal_inexact_durations_keep_avg_within_bounds() {
        let mut data = RouteAnalyticsData::new("GET", "/x");
        for _ in 0..3 {
            data.record(&meta(200, 0.1));
        }
        assert_eq!(data.min_duration_ms(), Some(0.1));
        assert_eq!(data.max_duration_ms(), Some(0.1));
        assert_eq!(data.avg_duration_ms(), Some(0.1));

        let stats = data.stats();
        let (min, avg, max) = (
            stats.min_duration_ms.unwrap(),
            stats.avg_duration_ms.unwrap(),
            stats.max_duration_ms.unwrap(),
        );
        assert!(min <= avg && avg <= max);
    }

    #[test]
    fn test_non_finite_duration_counts_as_zero() {
        let mut data = RouteAnalyticsData::new("GET", "/x");
        data.record(&meta(200, f64::NAN));
        data.record(&meta(200, 4.0));
        assert_eq!(data.request_count, 2);
        assert_eq!(data.min_duration_ms(), Some(0.0));
        assert_eq!(data.avg_duration_ms(), Some(2.0));
    }
}
