//! Registration-time conflict detection through the dispatch core.

use axum::http::StatusCode;
use serde_json::json;

use unified_router::dispatch::{DispatchError, RouterOptions, UnifiedRouter};
use unified_router::routing::{ConflictKind, HttpMethod, RouteDefinition, Severity};

mod common;

#[tokio::test]
async fn test_disjoint_static_routes_have_no_conflicts() {
    let router = UnifiedRouter::new();
    router
        .register_routes(
            &[
                RouteDefinition::get("/users", common::ok),
                RouteDefinition::get("/posts", common::ok),
                RouteDefinition::post("/users", common::ok),
                RouteDefinition::get("/users/active", common::ok),
            ],
            &RouterOptions::default(),
        )
        .unwrap();
    assert!(router.registry().conflicts().is_empty());
    assert_eq!(router.registry().len(), 4);
}

#[tokio::test]
async fn test_registration_order_is_kept() {
    let defs = [
        RouteDefinition::get("/c", common::ok),
        RouteDefinition::get("/a", common::ok),
        RouteDefinition::get("/b", common::ok),
    ];
    let router = UnifiedRouter::new();
    let bound = router.register_routes(&defs, &RouterOptions::default()).unwrap();
    let paths: Vec<&str> = bound.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/c", "/a", "/b"]);

    let registry = router.registry();
    let registered: Vec<&str> = registry.all().iter().map(|r| r.path.as_str()).collect();
    assert_eq!(registered, paths);
}

#[tokio::test]
async fn test_ambiguous_names_warn_and_first_serves() {
    let router = UnifiedRouter::new();
    router
        .register_routes(
            &[
                RouteDefinition::get("/users/:id", common::echo),
                RouteDefinition::get("/users/:userId", common::ok),
            ],
            &RouterOptions::default(),
        )
        .unwrap();

    {
        let registry = router.registry();
        let conflicts = registry.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Ambiguous);
        assert_eq!(conflicts[0].severity, Severity::Warning);
        assert!(!registry.has_errors());
    }

    let (status, body) = common::send(&router.router(), "GET", "/users/9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["params"], json!({ "id": "9" }));
}

#[tokio::test]
async fn test_overlap_between_static_and_param() {
    let router = UnifiedRouter::new();
    router
        .register_routes(
            &[
                RouteDefinition::get("/users/:id", common::ok),
                RouteDefinition::get("/users/me", common::ok),
            ],
            &RouterOptions::default(),
        )
        .unwrap();
    let registry = router.registry();
    assert_eq!(registry.conflicts()[0].kind, ConflictKind::PathOverlap);
    assert_eq!(registry.conflicts_by_severity(Severity::Warning).len(), 1);
}

#[tokio::test]
async fn test_catch_all_overlaps_deeper_routes() {
    let router = UnifiedRouter::new();
    router
        .register_routes(
            &[
                RouteDefinition::get("/files/*rest", common::echo),
                RouteDefinition::get("/files/a/b", common::ok),
            ],
            &RouterOptions::default(),
        )
        .unwrap();
    assert_eq!(router.registry().conflicts()[0].kind, ConflictKind::PathOverlap);

    let (status, body) = common::send(&router.router(), "GET", "/files/a/b", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["params"]["rest"], "a/b");
}

#[tokio::test]
async fn test_duplicate_is_blocked_and_reported() {
    let router = UnifiedRouter::new();
    router
        .register_routes(
            &[
                RouteDefinition::get("/health", common::ok).with_name("first"),
                RouteDefinition::get("/health/", common::echo).with_name("second"),
            ],
            &RouterOptions::default(),
        )
        .unwrap();

    let registry = router.registry();
    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get(HttpMethod::Get, "/health").unwrap().name.as_deref(),
        Some("first")
    );
    let err = registry.validate().unwrap_err();
    assert!(err.to_string().contains("Duplicate route"));
}

#[tokio::test]
async fn test_strict_mode_aborts_on_duplicates_only() {
    let router = UnifiedRouter::new();
    let err = router
        .register_routes(
            &[
                RouteDefinition::get("/users/:id", common::ok),
                RouteDefinition::get("/users/:uid", common::ok),
                RouteDefinition::get("/users/:id", common::ok),
            ],
            &RouterOptions::strict(),
        )
        .unwrap_err();
    match err {
        DispatchError::StrictConflicts(message) => {
            assert!(message.contains("GET /users/:id"));
            assert!(!message.contains("Ambiguous"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_methods_never_conflict() {
    let router = UnifiedRouter::new();
    router
        .register_routes(
            &[
                RouteDefinition::get("/items/:id", common::ok),
                RouteDefinition::put("/items/:id", common::ok),
                RouteDefinition::all("/items/:id", common::ok),
            ],
            &RouterOptions::default(),
        )
        .unwrap();
    assert!(router.registry().conflicts().is_empty());
    assert_eq!(router.registry().by_method(HttpMethod::All).len(), 1);
}
