//! Route registry with registration-time conflict detection.
//!
//! # Responsibilities
//! - Convert route definitions into immutable `RouteInfo` records
//! - Keep exactly one route per (method, path); first registration wins
//! - Classify every new route against the existing routes of its method
//! - Expose accumulated conflicts so startup can warn or abort
//!
//! # Design Decisions
//! - Written during startup only, read-only while serving
//! - Duplicates are recorded, never silently overwritten
//! - Conflict checks run in order: exact duplicate, ambiguous, overlap

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::routing::pattern::{classify, ParsedPath, PathError, Relation, Segment};
use crate::routing::{HttpMethod, RouteDefinition};

/// Registered route metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: HttpMethod,
    /// Canonical path as registered.
    pub path: String,
    pub name: Option<String>,
    /// Path with every parameter replaced by `:*` (catch-all by `*`).
    pub pattern: String,
    pub params: Vec<String>,
    #[serde(skip)]
    pub(crate) segments: Vec<Segment>,
}

impl RouteInfo {
    fn new(method: HttpMethod, parsed: ParsedPath, name: Option<String>) -> Self {
        Self {
            method,
            path: parsed.path,
            name,
            pattern: parsed.pattern,
            params: parsed.params,
            segments: parsed.segments,
        }
    }

    /// Parse a route without registering it.
    pub fn parse(method: HttpMethod, path: &str, name: Option<&str>) -> Result<Self, RegistryError> {
        let parsed = ParsedPath::parse(path).map_err(|source| RegistryError::InvalidPath {
            method,
            path: path.to_string(),
            source,
        })?;
        Ok(Self::new(method, parsed, name.map(str::to_string)))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    ExactDuplicate,
    PathOverlap,
    Ambiguous,
}

impl ConflictKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::ExactDuplicate => "EXACT_DUPLICATE",
            ConflictKind::PathOverlap => "PATH_OVERLAP",
            ConflictKind::Ambiguous => "AMBIGUOUS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks startup in strict mode.
    Error,
    /// Logged only.
    Warning,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A detected relationship between two routes that may cause wrong or
/// ambiguous dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct RouteConflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    /// The route registered first.
    pub existing: RouteInfo,
    /// The route whose registration produced the conflict.
    pub incoming: RouteInfo,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid route {method} {path}: {source}")]
    InvalidPath {
        method: HttpMethod,
        path: String,
        #[source]
        source: PathError,
    },

    #[error("route conflicts detected: {0}")]
    Conflicts(String),
}

/// Outcome of a single registration.
#[derive(Debug, Clone)]
pub enum Registration {
    Added(Arc<RouteInfo>),
    /// The key was already taken; carries the route that keeps it.
    Duplicate(Arc<RouteInfo>),
}

impl Registration {
    pub fn is_added(&self) -> bool {
        matches!(self, Registration::Added(_))
    }
}

type RouteKey = (HttpMethod, String);

/// Restore point for [`RouteRegistry::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    routes: usize,
    conflicts: usize,
}

/// The set of registered routes and the conflicts found while building it.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<Arc<RouteInfo>>,
    index: HashMap<RouteKey, usize>,
    conflicts: Vec<RouteConflict>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, recording any conflicts with existing routes.
    pub fn register(&mut self, def: &RouteDefinition) -> Result<Registration, RegistryError> {
        self.register_route(def.method, &def.path, def.name.as_deref())
    }

    /// Register by method and path, without a handler attached.
    pub fn register_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        name: Option<&str>,
    ) -> Result<Registration, RegistryError> {
        let info = RouteInfo::parse(method, path, name)?;
        let key = (method, info.path.clone());

        if let Some(&existing) = self.index.get(&key) {
            let existing = self.routes[existing].clone();
            self.conflicts.push(RouteConflict {
                kind: ConflictKind::ExactDuplicate,
                message: format!(
                    "Duplicate route: {} is already registered as {}; the first registration is kept",
                    info, existing
                ),
                existing: (*existing).clone(),
                incoming: info,
                severity: Severity::Error,
            });
            return Ok(Registration::Duplicate(existing));
        }

        let found: Vec<RouteConflict> = self
            .routes
            .iter()
            .filter(|existing| existing.method == method)
            .filter_map(|existing| structural_conflict(existing, &info))
            .collect();
        self.conflicts.extend(found);

        let info = Arc::new(info);
        self.index.insert(key, self.routes.len());
        self.routes.push(info.clone());
        Ok(Registration::Added(info))
    }

    /// Register definitions in order. All or nothing: a malformed path
    /// leaves the registry as it was before the call.
    pub fn register_many<'a, I>(&mut self, defs: I) -> Result<Vec<Registration>, RegistryError>
    where
        I: IntoIterator<Item = &'a RouteDefinition>,
    {
        let checkpoint = self.checkpoint();
        let result: Result<Vec<_>, _> = defs.into_iter().map(|def| self.register(def)).collect();
        if result.is_err() {
            self.rollback(checkpoint);
        }
        result
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            routes: self.routes.len(),
            conflicts: self.conflicts.len(),
        }
    }

    /// Drop every route and conflict recorded after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        if checkpoint.routes < self.routes.len() {
            for route in self.routes.drain(checkpoint.routes..) {
                self.index.remove(&(route.method, route.path.clone()));
            }
        }
        self.conflicts.truncate(checkpoint.conflicts);
    }

    pub fn has(&self, method: HttpMethod, path: &str) -> bool {
        self.index.contains_key(&(method, canonical(path)))
    }

    pub fn get(&self, method: HttpMethod, path: &str) -> Option<Arc<RouteInfo>> {
        self.index
            .get(&(method, canonical(path)))
            .map(|&i| self.routes[i].clone())
    }

    /// All routes in registration order.
    pub fn all(&self) -> &[Arc<RouteInfo>] {
        &self.routes
    }

    pub fn by_method(&self, method: HttpMethod) -> Vec<Arc<RouteInfo>> {
        self.routes
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn conflicts(&self) -> &[RouteConflict] {
        &self.conflicts
    }

    pub fn conflicts_by_severity(&self, severity: Severity) -> Vec<&RouteConflict> {
        self.conflicts
            .iter()
            .filter(|c| c.severity == severity)
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.conflicts.iter().any(|c| c.severity == Severity::Error)
    }

    /// Fails with every error-severity conflict joined into one message.
    ///
    /// Meant to run once after all routes are registered.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let errors: Vec<&str> = self
            .conflicts_by_severity(Severity::Error)
            .into_iter()
            .map(|c| c.message.as_str())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Conflicts(errors.join("; ")))
        }
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.index.clear();
        self.conflicts.clear();
    }
}

fn canonical(path: &str) -> String {
    ParsedPath::parse(path)
        .map(|parsed| parsed.path)
        .unwrap_or_else(|_| path.to_string())
}

fn structural_conflict(existing: &RouteInfo, incoming: &RouteInfo) -> Option<RouteConflict> {
    let (kind, message) = match classify(&existing.segments, &incoming.segments) {
        Relation::Disjoint => return None,
        Relation::Ambiguous => (
            ConflictKind::Ambiguous,
            format!(
                "Ambiguous routes: {} and {} match exactly the same requests (pattern {})",
                existing, incoming, incoming.pattern
            ),
        ),
        Relation::Overlap => (
            ConflictKind::PathOverlap,
            format!(
                "Overlapping routes: {} and {} can match the same request; {} takes precedence",
                existing, incoming, existing.path
            ),
        ),
    };

    Some(RouteConflict {
        kind,
        existing: existing.clone(),
        incoming: incoming.clone(),
        message,
        severity: Severity::Warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchRequest, HandlerResult, Reply};

    async fn noop(_req: DispatchRequest) -> HandlerResult {
        Ok(Reply::Empty)
    }

    fn register(registry: &mut RouteRegistry, method: HttpMethod, path: &str) -> Registration {
        registry.register_route(method, path, None).unwrap()
    }

    fn kinds(registry: &RouteRegistry) -> Vec<ConflictKind> {
        registry.conflicts().iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_route_info_derivation() {
        let mut registry = RouteRegistry::new();
        let info = match register(&mut registry, HttpMethod::Get, "/teams/:teamId/members/:id") {
            Registration::Added(info) => info,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(info.pattern, "/teams/:*/members/:*");
        assert_eq!(info.params, vec!["teamId", "id"]);
        assert!(registry.has(HttpMethod::Get, "/teams/:teamId/members/:id"));
    }

    #[test]
    fn test_exact_duplicate_keeps_first() {
        let mut registry = RouteRegistry::new();
        registry
            .register_route(HttpMethod::Post, "/login", Some("first"))
            .unwrap();
        let second = registry
            .register_route(HttpMethod::Post, "/login", Some("second"))
            .unwrap();

        assert!(!second.is_added());
        assert_eq!(kinds(&registry), vec![ConflictKind::ExactDuplicate]);
        assert_eq!(registry.conflicts()[0].severity, Severity::Error);

        let method: HttpMethod = "post".parse().unwrap();
        let kept = registry.get(method, "/login").unwrap();
        assert_eq!(kept.name.as_deref(), Some("first"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_trailing_slash_is_the_same_route() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/health");
        register(&mut registry, HttpMethod::Get, "/health/");
        assert_eq!(kinds(&registry), vec![ConflictKind::ExactDuplicate]);
    }

    #[test]
    fn test_ambiguous_params() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/users/:id");
        register(&mut registry, HttpMethod::Get, "/users/:userId");

        assert_eq!(kinds(&registry), vec![ConflictKind::Ambiguous]);
        assert_eq!(registry.conflicts()[0].severity, Severity::Warning);
        assert_eq!(registry.conflicts()[0].existing.path, "/users/:id");
        assert_eq!(registry.conflicts()[0].incoming.path, "/users/:userId");
        assert!(!registry.has_errors());
    }

    #[test]
    fn test_disjoint_statics_never_conflict() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/users/:id");
        register(&mut registry, HttpMethod::Get, "/posts/:id");
        assert!(registry.conflicts().is_empty());
    }

    #[test]
    fn test_overlap_is_a_warning() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/users/:id");
        register(&mut registry, HttpMethod::Get, "/users/me");

        assert_eq!(kinds(&registry), vec![ConflictKind::PathOverlap]);
        assert_eq!(registry.len(), 2);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_different_methods_never_conflict() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/items/:id");
        register(&mut registry, HttpMethod::Delete, "/items/:id");
        register(&mut registry, HttpMethod::Post, "/items/:itemId");
        register(&mut registry, HttpMethod::All, "/items/:id");
        assert!(registry.conflicts().is_empty());
        assert_eq!(registry.by_method(HttpMethod::Get).len(), 1);
    }

    #[test]
    fn test_zero_param_routes_conflict_only_when_identical() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/about");
        register(&mut registry, HttpMethod::Get, "/contact");
        register(&mut registry, HttpMethod::Get, "/about/team");
        assert!(registry.conflicts().is_empty());

        register(&mut registry, HttpMethod::Get, "/about");
        assert_eq!(kinds(&registry), vec![ConflictKind::ExactDuplicate]);
    }

    #[test]
    fn test_reregistration_adds_one_duplicate_per_route() {
        let defs = [
            (HttpMethod::Get, "/users/:id"),
            (HttpMethod::Get, "/users/me"),
        ];

        let mut once = RouteRegistry::new();
        for (method, path) in defs {
            register(&mut once, method, path);
        }

        let mut twice = RouteRegistry::new();
        for _ in 0..2 {
            for (method, path) in defs {
                register(&mut twice, method, path);
            }
        }

        let mut expected = kinds(&once);
        expected.extend([ConflictKind::ExactDuplicate, ConflictKind::ExactDuplicate]);
        assert_eq!(kinds(&twice), expected);
        assert_eq!(twice.len(), once.len());
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Post, "/login");
        register(&mut registry, HttpMethod::Post, "/login");
        register(&mut registry, HttpMethod::Get, "/me");
        register(&mut registry, HttpMethod::Get, "/me");

        assert!(registry.has_errors());
        assert_eq!(registry.conflicts_by_severity(Severity::Error).len(), 2);
        let err = registry.validate().unwrap_err().to_string();
        assert!(err.contains("POST /login"));
        assert!(err.contains("GET /me"));
    }

    #[test]
    fn test_invalid_path_is_rejected() {
        let mut registry = RouteRegistry::new();
        let err = registry
            .register_route(HttpMethod::Get, "users/:id", None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPath { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_malformed_path_leaves_registry_untouched() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/users/:id");
        let defs = [
            RouteDefinition::get("/a", noop),
            RouteDefinition::get("/users/:uid", noop),
            RouteDefinition::get("bad", noop),
        ];
        assert!(registry.register_many(&defs).is_err());
        assert_eq!(registry.len(), 1);
        assert!(!registry.has(HttpMethod::Get, "/a"));
        assert!(registry.conflicts().is_empty());

        let outcomes = registry.register_many(&defs[..1]).unwrap();
        assert!(outcomes[0].is_added());
        assert!(registry.conflicts().is_empty());
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/a");
        let checkpoint = registry.checkpoint();
        register(&mut registry, HttpMethod::Get, "/a");
        register(&mut registry, HttpMethod::Post, "/b");
        registry.rollback(checkpoint);

        assert_eq!(registry.len(), 1);
        assert!(registry.conflicts().is_empty());
        assert!(!registry.has(HttpMethod::Post, "/b"));
        assert!(register(&mut registry, HttpMethod::Post, "/b").is_added());
    }

    #[test]
    fn test_clear() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/a");
        register(&mut registry, HttpMethod::Get, "/a");
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.conflicts().is_empty());
        assert!(!registry.has(HttpMethod::Get, "/a"));
    }

    #[test]
    fn test_conflict_serialization() {
        let mut registry = RouteRegistry::new();
        register(&mut registry, HttpMethod::Get, "/users/:id");
        register(&mut registry, HttpMethod::Get, "/users/:userId");
        let json = serde_json::to_value(&registry.conflicts()[0]).unwrap();
        assert_eq!(json["type"], "AMBIGUOUS");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["existing"]["pattern"], "/users/:*");
    }
}
