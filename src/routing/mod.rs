//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     RouteDefinition[]
//!     → pattern.rs (canonical path, normalized pattern, params)
//!     → registry.rs (uniqueness + conflict classification)
//!     → router.rs (bind in registration order)
//!
//! Incoming Request (method, path)
//!     → router.rs (ordered lookup)
//!     → matcher.rs (evaluate method + segments)
//!     → Return: matched entry with params, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: first registered match wins

pub mod definition;
pub mod matcher;
pub mod method;
pub mod pattern;
pub mod registry;
pub mod router;

pub use definition::RouteDefinition;
pub use method::HttpMethod;
pub use registry::{
    ConflictKind, Registration, RegistryError, RouteConflict, RouteInfo, RouteRegistry, Severity,
};
pub use router::RouteTable;
