//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: dispatch core plus diagnostics endpoints
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and serve until shutdown

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RouterConfig;
use crate::diagnostics::diagnostics_router;
use crate::dispatch::UnifiedRouter;
use crate::http::request::{propagate_request_id, set_request_id};

/// HTTP front end of a `UnifiedRouter`.
pub struct HttpServer {
    router: Router,
    config: RouterConfig,
}

impl HttpServer {
    pub fn new(config: RouterConfig, dispatch: Arc<UnifiedRouter>) -> Self {
        let router = Self::build_router(&config, &dispatch);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, dispatch: &Arc<UnifiedRouter>) -> Router {
        let mut app = dispatch.router();
        if config.diagnostics.enabled {
            app = diagnostics_router(dispatch.clone(), &config.diagnostics).merge(app);
        }

        app.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id())
    }

    /// The fully layered application, for in-process use.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}
