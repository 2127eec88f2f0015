//! Caller-supplied route definitions.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::{Middleware, RouteHandler};
use crate::routing::HttpMethod;
use crate::validation::RouteSchemas;

/// A route as declared by the application: what to match and what to run.
///
/// Definitions are built once at startup with the builder methods and are
/// not modified afterwards.
#[derive(Clone)]
pub struct RouteDefinition {
    pub method: HttpMethod,
    /// Path with `:name` parameters and an optional trailing `*name`.
    pub path: String,
    /// Optional identifier used in logs and diagnostics.
    pub name: Option<String>,
    pub handler: Arc<dyn RouteHandler>,
    /// Run in order before validation and the handler.
    pub middlewares: Vec<Arc<dyn Middleware>>,
    pub validate: Option<RouteSchemas>,
}

impl RouteDefinition {
    pub fn new(method: HttpMethod, path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self {
            method,
            path: path.into(),
            name: None,
            handler: Arc::new(handler),
            middlewares: Vec::new(),
            validate: None,
        }
    }

    pub fn get(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::Get, path, handler)
    }

    pub fn post(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::Post, path, handler)
    }

    pub fn put(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::Put, path, handler)
    }

    pub fn patch(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::Patch, path, handler)
    }

    pub fn delete(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::Delete, path, handler)
    }

    pub fn options(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::Options, path, handler)
    }

    pub fn head(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::Head, path, handler)
    }

    pub fn all(path: impl Into<String>, handler: impl RouteHandler) -> Self {
        Self::new(HttpMethod::All, path, handler)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn with_validation(mut self, schemas: RouteSchemas) -> Self {
        self.validate = Some(schemas);
        self
    }

    /// Same definition mounted under `prefix`.
    pub(crate) fn prefixed(&self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        let mut def = self.clone();
        if !prefix.is_empty() {
            def.path = format!("{}{}", prefix, self.path);
        }
        def
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("middlewares", &self.middlewares.len())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}
