//! Route analytics subsystem.
//!
//! # Data Flow
//! ```text
//! Completed request (dispatch wrapper)
//!     → RequestMetadata (method, route path, status, duration, error)
//!     → store.rs (lazily created per-route record, updated in place)
//!
//! Consumers (read only):
//!     → summary / ranked lists / stale routes
//!     → export() snapshot → report.rs or JSON
//! ```
//!
//! # Design Decisions
//! - Keyed by route path, not concrete URL, so `/users/1` and `/users/2`
//!   aggregate under `/users/:id`
//! - Aggregates computed on demand, never cached
//! - Per-route updates are atomic under the map's entry lock

pub mod report;
pub mod store;
pub mod types;

pub use store::{RouteAnalytics, SUMMARY_TOP_N};
pub use types::{
    AnalyticsExport, AnalyticsSummary, RequestMetadata, RouteAnalyticsData, RouteStats,
};
