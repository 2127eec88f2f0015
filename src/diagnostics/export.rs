//! Periodic analytics export.
//!
//! # Responsibilities
//! - Log the analytics snapshot as JSON on a fixed interval
//! - Stop when shutdown is signalled, logging a final plain-text report

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::analytics::{report, RouteAnalytics};

pub struct AnalyticsExporter {
    analytics: Arc<RouteAnalytics>,
    interval: Duration,
}

impl AnalyticsExporter {
    pub fn new(analytics: Arc<RouteAnalytics>, interval: Duration) -> Self {
        Self {
            analytics,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Periodic analytics export disabled");
            return;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Analytics exporter starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately; skip the empty snapshot.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.export_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Analytics exporter received shutdown signal, exiting loop");
                    tracing::info!("\n{}", report::render(&self.analytics.export()));
                    break;
                }
            }
        }
    }

    fn export_once(&self) {
        let export = self.analytics.export();
        match serde_json::to_string(&export) {
            Ok(json) => tracing::info!(
                routes = export.routes.len(),
                total_requests = export.summary.total_requests,
                export = %json,
                "Analytics snapshot"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to serialize analytics snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let exporter =
            AnalyticsExporter::new(Arc::new(RouteAnalytics::new()), Duration::from_millis(5));
        let handle = tokio::spawn(exporter.run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_interval_returns_immediately() {
        let shutdown = Shutdown::new();
        let exporter = AnalyticsExporter::new(Arc::new(RouteAnalytics::new()), Duration::ZERO);
        tokio::time::timeout(Duration::from_secs(1), exporter.run(shutdown.subscribe()))
            .await
            .unwrap();
    }
}
