//! Ordered route table used for dispatch.
//!
//! # Responsibilities
//! - Store bound routes in registration order
//! - Look up the first route matching a request
//! - Return the matched entry or an explicit no-match
//!
//! # Design Decisions
//! - Immutable once published (shared without locks)
//! - O(n) scan over routes; first match wins, like registration order
//! - Overlapping routes are legal here; the registry reports them

use axum::http::Method;

use crate::routing::matcher::{Matcher, PathParams, RouteMatcher};
use crate::routing::RouteInfo;

/// A lookup result: the bound entry plus captured parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub entry: &'a T,
    pub params: PathParams,
}

/// Routes bound to values of type `T`, matched in insertion order.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    entries: Vec<(RouteMatcher, T)>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, route: &RouteInfo, entry: T) {
        self.entries.push((RouteMatcher::new(route), entry));
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.entries.iter().find_map(|(matcher, entry)| {
            matcher
                .match_request(method, path)
                .map(|params| RouteMatch { entry, params })
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, entry)| entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{HttpMethod, RouteRegistry};

    #[test]
    fn test_first_match_wins() {
        let mut registry = RouteRegistry::new();
        registry.register_route(HttpMethod::Get, "/users/:id", None).unwrap();
        registry.register_route(HttpMethod::Get, "/users/me", None).unwrap();

        let mut table = RouteTable::new();
        for (i, route) in registry.all().iter().enumerate() {
            table.bind(route, i);
        }

        let hit = table.lookup(&Method::GET, "/users/me").unwrap();
        assert_eq!(*hit.entry, 0);
        assert_eq!(hit.params, vec![("id".to_string(), "me".to_string())]);
        assert!(table.lookup(&Method::GET, "/posts/1").is_none());
        assert_eq!(table.len(), 2);
    }
}
