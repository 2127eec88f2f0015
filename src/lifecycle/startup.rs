//! Startup orchestration.
//!
//! # Responsibilities
//! - Apply configuration to the dispatch core
//! - Start background tasks (metrics, analytics export)
//! - Serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Routes are registered by the caller before `run`, so conflicts are
//!   reported before the listener accepts traffic

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::RouterConfig;
use crate::diagnostics::AnalyticsExporter;
use crate::dispatch::UnifiedRouter;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Serve `router` on `listener` until `shutdown` is triggered.
pub async fn run(
    config: RouterConfig,
    router: Arc<UnifiedRouter>,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<(), std::io::Error> {
    router.set_body_limit(config.limits.max_body_bytes);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let exporter = if config.diagnostics.export_interval_secs > 0 {
        let exporter = AnalyticsExporter::new(
            router.analytics().clone(),
            Duration::from_secs(config.diagnostics.export_interval_secs),
        );
        Some(tokio::spawn(exporter.run(shutdown.subscribe())))
    } else {
        None
    };

    let conflicts = router.registry().conflicts().len();
    tracing::info!(
        routes = router.route_count(),
        conflicts,
        "Dispatch core ready"
    );

    let server = HttpServer::new(config, router);
    let result = server.run(listener, shutdown.signalled()).await;

    if let Some(handle) = exporter {
        let _ = handle.await;
    }
    result
}
