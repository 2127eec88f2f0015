//! Dispatch core: turns route definitions into a served axum `Router`.
//!
//! # Data Flow
//! ```text
//! register_routes(defs, options)
//!     → registry (conflicts logged; strict mode aborts on errors)
//!     → chain.rs (one DispatchChain per accepted route)
//!     → dispatch table (ordered, swapped in atomically)
//!
//! Incoming Request
//!     → router() fallback → table lookup (first match wins)
//!     → DispatchChain: middlewares → validation → handler → reply
//!     → analytics (every terminal case, including cancellation)
//! ```
//!
//! # Design Decisions
//! - Matching uses the crate's own table, not axum's path router, so
//!   overlapping and ambiguous routes are served instead of panicking
//! - Registry, analytics and table belong to one `UnifiedRouter`; a
//!   process-wide instance exists for applications that want one
//! - Route groups registered separately share one conflict universe

pub mod chain;
pub mod error;
pub mod handler;
pub mod request;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard};
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use crate::analytics::RouteAnalytics;
use crate::observability::metrics;
use crate::routing::{
    Registration, RouteConflict, RouteDefinition, RouteInfo, RouteRegistry, RouteTable, Severity,
};

pub use chain::{DispatchChain, RequestPhase, Stage, CLIENT_CLOSED_REQUEST, REQUEST_ID_HEADER};
pub use error::{DefaultErrorResponder, DispatchError, ErrorResponder, HandlerError};
pub use handler::{Flow, HandlerResult, Middleware, Reply, RouteHandler};
pub use request::DispatchRequest;

/// Matches axum's default request body limit.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Per-group registration options.
#[derive(Clone)]
pub struct RouterOptions {
    pub enable_registry: bool,
    pub enable_analytics: bool,
    /// Fail registration when error-severity conflicts are found.
    pub strict_mode: bool,
    /// Mounted in front of every path of the group.
    pub prefix: Option<String>,
    pub error_responder: Option<Arc<dyn ErrorResponder>>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            enable_registry: true,
            enable_analytics: true,
            strict_mode: false,
            prefix: None,
            error_responder: None,
        }
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("enable_registry", &self.enable_registry)
            .field("enable_analytics", &self.enable_analytics)
            .field("strict_mode", &self.strict_mode)
            .field("prefix", &self.prefix)
            .field("error_responder", &self.error_responder.is_some())
            .finish()
    }
}

impl RouterOptions {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_error_responder(mut self, responder: impl ErrorResponder) -> Self {
        self.error_responder = Some(Arc::new(responder));
        self
    }
}

type DispatchTable = RouteTable<Arc<DispatchChain>>;

/// Registry, analytics and dispatch table of one application.
pub struct UnifiedRouter {
    registry: RwLock<RouteRegistry>,
    analytics: Arc<RouteAnalytics>,
    table: ArcSwap<DispatchTable>,
    body_limit: AtomicUsize,
}

impl fmt::Debug for UnifiedRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedRouter")
            .field("routes", &self.table.load().len())
            .field("body_limit", &self.body_limit())
            .finish()
    }
}

impl Default for UnifiedRouter {
    fn default() -> Self {
        Self {
            registry: RwLock::new(RouteRegistry::new()),
            analytics: Arc::new(RouteAnalytics::new()),
            table: ArcSwap::from_pointee(DispatchTable::new()),
            body_limit: AtomicUsize::new(DEFAULT_BODY_LIMIT),
        }
    }
}

static GLOBAL: OnceLock<Arc<UnifiedRouter>> = OnceLock::new();

impl UnifiedRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The process-wide instance shared by all route groups.
    pub fn global() -> &'static Arc<UnifiedRouter> {
        GLOBAL.get_or_init(UnifiedRouter::new)
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, RouteRegistry> {
        self.registry.read().expect("route registry lock poisoned")
    }

    pub fn analytics(&self) -> &Arc<RouteAnalytics> {
        &self.analytics
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit.load(Ordering::Relaxed)
    }

    pub fn set_body_limit(&self, limit: usize) {
        self.body_limit.store(limit, Ordering::Relaxed);
    }

    /// Number of routes currently bound for dispatch.
    pub fn route_count(&self) -> usize {
        self.table.load().len()
    }

    /// Register a group of routes and bind them for dispatch.
    ///
    /// Returns the routes that were bound, in order. Exact duplicates are
    /// logged and skipped; in strict mode they fail the whole call.
    pub fn register_routes(
        &self,
        defs: &[RouteDefinition],
        options: &RouterOptions,
    ) -> Result<Vec<Arc<RouteInfo>>, DispatchError> {
        let defs: Vec<RouteDefinition> = match options.prefix.as_deref() {
            Some(prefix) => defs.iter().map(|def| def.prefixed(prefix)).collect(),
            None => defs.to_vec(),
        };

        let routes = if options.enable_registry {
            self.register_checked(&defs, options.strict_mode)?
        } else {
            defs.iter()
                .map(|def| {
                    RouteInfo::parse(def.method, &def.path, def.name.as_deref())
                        .map(|info| Some(Arc::new(info)))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let analytics = options.enable_analytics.then(|| self.analytics.clone());
        let responder = options
            .error_responder
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultErrorResponder));

        let chains: Vec<Arc<DispatchChain>> = defs
            .iter()
            .zip(routes)
            .filter_map(|(def, route)| {
                route.map(|route| {
                    Arc::new(DispatchChain::build(
                        def,
                        route,
                        analytics.clone(),
                        responder.clone(),
                    ))
                })
            })
            .collect();

        self.table.rcu(|current| {
            let mut table = DispatchTable::clone(current);
            for chain in &chains {
                table.bind(chain.route(), chain.clone());
            }
            table
        });

        for chain in &chains {
            tracing::debug!(route = %chain.route(), stages = chain.stages().len(), "Route bound");
        }
        tracing::info!(
            routes = chains.len(),
            prefix = options.prefix.as_deref().unwrap_or(""),
            "Routes registered"
        );

        Ok(chains.iter().map(|chain| chain.route().clone()).collect())
    }

    /// One entry per definition: the route to bind, or `None` for a duplicate.
    fn register_checked(
        &self,
        defs: &[RouteDefinition],
        strict: bool,
    ) -> Result<Vec<Option<Arc<RouteInfo>>>, DispatchError> {
        let mut registry = self.registry.write().expect("route registry lock poisoned");
        let checkpoint = registry.checkpoint();
        let seen = registry.conflicts().len();
        let outcomes = registry.register_many(defs)?;

        let found = &registry.conflicts()[seen..];
        for conflict in found {
            log_conflict(conflict);
        }

        if strict {
            let errors: Vec<&str> = found
                .iter()
                .filter(|c| c.severity == Severity::Error)
                .map(|c| c.message.as_str())
                .collect();
            if !errors.is_empty() {
                let message = errors.join("; ");
                registry.rollback(checkpoint);
                return Err(DispatchError::StrictConflicts(message));
            }
        }

        Ok(outcomes
            .into_iter()
            .map(|outcome| match outcome {
                Registration::Added(info) => Some(info),
                Registration::Duplicate(_) => None,
            })
            .collect())
    }

    /// An axum `Router` serving every route bound on this instance,
    /// including groups registered after the call.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new().fallback(dispatch).with_state(self.clone())
    }

    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let table = self.table.load_full();
        let Some(hit) = table.lookup(request.method(), request.uri().path()) else {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "No route matched"
            );
            return not_found();
        };
        hit.entry
            .handle(request, hit.params, self.body_limit(), start)
            .await
    }

    /// Clear registry, analytics and dispatch table.
    pub fn reset(&self) {
        self.registry
            .write()
            .expect("route registry lock poisoned")
            .clear();
        self.analytics.clear();
        self.table.store(Arc::new(DispatchTable::new()));
    }
}

async fn dispatch(State(router): State<Arc<UnifiedRouter>>, request: Request<Body>) -> Response {
    router.handle(request).await
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" }))).into_response()
}

fn log_conflict(conflict: &RouteConflict) {
    metrics::record_conflict(conflict.kind, conflict.severity);
    match conflict.severity {
        Severity::Error => tracing::error!(
            kind = conflict.kind.as_str(),
            existing = %conflict.existing,
            incoming = %conflict.incoming,
            "{}",
            conflict.message
        ),
        Severity::Warning => tracing::warn!(
            kind = conflict.kind.as_str(),
            existing = %conflict.existing,
            incoming = %conflict.incoming,
            "{}",
            conflict.message
        ),
    }
}

/// Register a group on the process-wide instance.
pub fn register_routes(
    defs: &[RouteDefinition],
    options: &RouterOptions,
) -> Result<Vec<Arc<RouteInfo>>, DispatchError> {
    UnifiedRouter::global().register_routes(defs, options)
}

pub fn route_registry() -> RwLockReadGuard<'static, RouteRegistry> {
    UnifiedRouter::global().registry()
}

pub fn route_analytics() -> Arc<RouteAnalytics> {
    UnifiedRouter::global().analytics().clone()
}

/// Reset the process-wide instance. Meant for tests.
pub fn reset_router_state() {
    UnifiedRouter::global().reset();
}
