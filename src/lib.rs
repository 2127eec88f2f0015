//! Unified route registry, validation, dispatch and analytics.
//!
//! # Architecture Overview
//!
//! ```text
//!   RouteDefinition[] ──▶ routing::registry ──▶ dispatch (one chain per route)
//!                           (conflicts)              │
//!                                                    ▼
//!   Client Request ──▶ http::server ──▶ dispatch table (first match wins)
//!                                                    │
//!                         middlewares → validation → handler → reply
//!                                                    │
//!                                                    ▼
//!                                     analytics ◀── outcome (status, duration)
//!                                         │
//!                                         └──▶ diagnostics endpoints, metrics
//! ```

pub mod analytics;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod validation;

pub use config::RouterConfig;
pub use dispatch::{
    reset_router_state, route_analytics, route_registry, DispatchRequest, Flow, HandlerError,
    HandlerResult, Reply, RouterOptions, UnifiedRouter,
};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{HttpMethod, RouteDefinition};
pub use validation::{FieldSchema, ObjectSchema, RouteSchemas, Schema};
