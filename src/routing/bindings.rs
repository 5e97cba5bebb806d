//! Host-supplied handlers and middleware, keyed by source file.
//!
//! Route keys are the route file path without extension (`users/[id].get`);
//! middleware keys are the declaring directory (`users/[id]`, `""` for global).

use std::collections::HashMap;
use std::fmt;

use crate::discovery::route_file::normalize_key;
use crate::middleware::layer::MiddlewareExport;
use crate::routing::route::Handler;
use crate::validation::ValidationSchema;

/// What a route file provides.
#[derive(Clone)]
pub struct RouteBinding {
    pub handler: Handler,
    pub body_schema: Option<ValidationSchema>,
    pub query_schema: Option<ValidationSchema>,
    pub body_type_hint: Option<String>,
    pub query_type_hint: Option<String>,
}

impl RouteBinding {
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            body_schema: None,
            query_schema: None,
            body_type_hint: None,
            query_type_hint: None,
        }
    }

    pub fn body_schema(mut self, schema: ValidationSchema) -> Self {
        self.body_schema = Some(schema);
        self
    }

    pub fn query_schema(mut self, schema: ValidationSchema) -> Self {
        self.query_schema = Some(schema);
        self
    }

    pub fn body_type(mut self, hint: impl Into<String>) -> Self {
        self.body_type_hint = Some(hint.into());
        self
    }

    pub fn query_type(mut self, hint: impl Into<String>) -> Self {
        self.query_type_hint = Some(hint.into());
        self
    }
}

impl From<Handler> for RouteBinding {
    fn from(handler: Handler) -> Self {
        RouteBinding::new(handler)
    }
}

/// Registry of everything the host binds to discovered files.
#[derive(Clone, Default)]
pub struct Bindings {
    routes: HashMap<String, RouteBinding>,
    middleware: HashMap<String, MiddlewareExport>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a route file, e.g. `route("users/[id].get", binding)`.
    pub fn route(mut self, key: &str, binding: impl Into<RouteBinding>) -> Self {
        self.routes.insert(normalize_key(key), binding.into());
        self
    }

    /// Shorthand for binding a bare handler.
    pub fn handler(self, key: &str, handler: Handler) -> Self {
        self.route(key, RouteBinding::new(handler))
    }

    /// Binds the middleware file of a directory.
    pub fn middleware(mut self, directory: &str, export: impl Into<MiddlewareExport>) -> Self {
        self.middleware.insert(normalize_key(directory), export.into());
        self
    }

    pub fn route_binding(&self, key: &str) -> Option<&RouteBinding> {
        self.routes.get(key)
    }

    pub fn middleware_export(&self, directory: &str) -> Option<&MiddlewareExport> {
        self.middleware.get(directory)
    }

    pub fn route_keys(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn middleware_keys(&self) -> impl Iterator<Item = &str> {
        self.middleware.keys().map(String::as_str)
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<_> = self.route_keys().collect();
        let mut middleware: Vec<_> = self.middleware_keys().collect();
        routes.sort_unstable();
        middleware.sort_unstable();
        f.debug_struct("Bindings")
            .field("routes", &routes)
            .field("middleware", &middleware)
            .finish()
    }
}
