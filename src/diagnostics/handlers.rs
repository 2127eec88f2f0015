use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::analytics::{AnalyticsExport, AnalyticsSummary, RouteStats};
use crate::dispatch::UnifiedRouter;
use crate::routing::{RouteConflict, Severity};

#[derive(Clone)]
pub struct DiagnosticsState {
    pub router: Arc<UnifiedRouter>,
    pub top_n: usize,
    pub stale_threshold: Duration,
}

/// Optional `?limit=` on the ranked lists.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// Optional `?threshold_secs=` on the stale list.
#[derive(Debug, Default, Deserialize)]
pub struct StaleParams {
    pub threshold_secs: Option<u64>,
}

#[derive(Serialize)]
pub struct ConflictReport {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub conflicts: Vec<RouteConflict>,
}

impl DiagnosticsState {
    fn limit(&self, params: &ListParams) -> usize {
        params.limit.unwrap_or(self.top_n)
    }
}

pub async fn get_summary(State(state): State<DiagnosticsState>) -> Json<AnalyticsSummary> {
    Json(state.router.analytics().summary())
}

pub async fn get_slowest(
    State(state): State<DiagnosticsState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<RouteStats>> {
    Json(state.router.analytics().slowest_routes(state.limit(&params)))
}

pub async fn get_popular(
    State(state): State<DiagnosticsState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<RouteStats>> {
    Json(state.router.analytics().most_accessed_routes(state.limit(&params)))
}

pub async fn get_error_prone(
    State(state): State<DiagnosticsState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<RouteStats>> {
    Json(state.router.analytics().error_prone_routes(state.limit(&params)))
}

pub async fn get_stale(
    State(state): State<DiagnosticsState>,
    Query(params): Query<StaleParams>,
) -> Json<Vec<RouteStats>> {
    let threshold = params
        .threshold_secs
        .map(Duration::from_secs)
        .unwrap_or(state.stale_threshold);
    Json(state.router.analytics().stale_routes(threshold))
}

pub async fn get_export(State(state): State<DiagnosticsState>) -> Json<AnalyticsExport> {
    Json(state.router.analytics().export())
}

pub async fn get_conflicts(State(state): State<DiagnosticsState>) -> Json<ConflictReport> {
    let conflicts = state.router.registry().conflicts().to_vec();
    let errors = conflicts
        .iter()
        .filter(|c| c.severity == Severity::Error)
        .count();
    Json(ConflictReport {
        total: conflicts.len(),
        errors,
        warnings: conflicts.len() - errors,
        conflicts,
    })
}
