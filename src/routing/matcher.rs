//! Request matching against registered routes.
//!
//! # Responsibilities
//! - Match request method (ALL accepts any method)
//! - Match request path segment by segment
//! - Capture parameter values in declaration order
//!
//! # Design Decisions
//! - Static segments are case-sensitive
//! - Empty path segments are ignored, so `/a/` matches `/a`
//! - No regex, matching is a single pass over the segments

use axum::http::Method;

use crate::routing::pattern::{match_path, Segment};
use crate::routing::{HttpMethod, RouteInfo};

/// Captured path parameters, in declaration order.
pub type PathParams = Vec<(String, String)>;

/// Trait for matching requests against a route.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the captured parameters if the request matches.
    fn match_request(&self, method: &Method, path: &str) -> Option<PathParams>;
}

/// Matches method and path of one registered route.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    method: HttpMethod,
    segments: Vec<Segment>,
}

impl RouteMatcher {
    pub fn new(route: &RouteInfo) -> Self {
        Self {
            method: route.method,
            segments: route.segments().to_vec(),
        }
    }
}

impl Matcher for RouteMatcher {
    fn match_request(&self, method: &Method, path: &str) -> Option<PathParams> {
        if !self.method.accepts(method) {
            return None;
        }
        match_path(&self.segments, path)
    }
}
