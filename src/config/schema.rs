//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::dispatch::RouterOptions;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Registration behavior of the dispatch core.
    pub router: RouterSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Read-only analytics endpoints.
    pub diagnostics: DiagnosticsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RouterSettings {
    /// Record routes and detect conflicts at registration.
    pub enable_registry: bool,

    /// Record per-route analytics for every request.
    pub enable_analytics: bool,

    /// Refuse to start when duplicate routes are registered.
    pub strict_mode: bool,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            enable_registry: true,
            enable_analytics: true,
            strict_mode: false,
        }
    }
}

impl RouterSettings {
    pub fn options(&self) -> RouterOptions {
        RouterOptions {
            enable_registry: self.enable_registry,
            enable_analytics: self.enable_analytics,
            strict_mode: self.strict_mode,
            ..RouterOptions::default()
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest request body buffered for validation, in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: crate::dispatch::DEFAULT_BODY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`.
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "unified_router=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Mount the analytics endpoints.
    pub enabled: bool,

    /// Path the endpoints are mounted under.
    pub path_prefix: String,

    /// Routes idle for longer than this are reported as stale.
    pub stale_threshold_secs: u64,

    /// Interval of the periodic analytics export to the log; 0 disables it.
    pub export_interval_secs: u64,

    /// Length of the ranked route lists.
    pub top_n: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path_prefix: "/_router".to_string(),
            stale_threshold_secs: 3600,
            export_interval_secs: 0,
            top_n: 10,
        }
    }
}
