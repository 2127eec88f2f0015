//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch core produces:
//!     → logging.rs (structured log events, one span per request)
//!     → metrics.rs (counters and histograms per route)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID is a field of every per-request span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
