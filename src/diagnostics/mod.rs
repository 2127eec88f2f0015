//! Read-only analytics and registry endpoints.
//!
//! # Routes (under the configured prefix)
//! - `GET /summary`: aggregate analytics
//! - `GET /routes/slowest`, `/routes/popular`, `/routes/errors`: ranked lists, `?limit=`
//! - `GET /routes/stale`: idle routes, `?threshold_secs=`
//! - `GET /export`: full snapshot
//! - `GET /conflicts`: registration conflicts
//!
//! # Design Decisions
//! - Served by axum's own router and merged next to the dispatch fallback,
//!   so diagnostics requests never show up in route analytics
//! - Nothing here mutates the registry or the analytics store

pub mod export;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;

use crate::config::DiagnosticsConfig;
use crate::dispatch::UnifiedRouter;

pub use export::AnalyticsExporter;
pub use handlers::DiagnosticsState;

pub fn diagnostics_router(router: Arc<UnifiedRouter>, config: &DiagnosticsConfig) -> Router {
    let state = DiagnosticsState {
        router,
        top_n: config.top_n,
        stale_threshold: Duration::from_secs(config.stale_threshold_secs),
    };

    let routes = Router::new()
        .route("/summary", get(handlers::get_summary))
        .route("/routes/slowest", get(handlers::get_slowest))
        .route("/routes/popular", get(handlers::get_popular))
        .route("/routes/errors", get(handlers::get_error_prone))
        .route("/routes/stale", get(handlers::get_stale))
        .route("/export", get(handlers::get_export))
        .route("/conflicts", get(handlers::get_conflicts))
        .with_state(state);

    Router::new().nest(&config.path_prefix, routes)
}
