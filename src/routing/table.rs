//! Routing table and its snapshot store.
//!
//! # Responsibilities
//! - Bind discovered files to host handlers and compile them into a table
//! - Publish tables atomically for concurrent readers
//!
//! # Design Decisions
//! - A table is immutable; reload builds a new one and swaps it in
//! - Readers take an `Arc<RoutingTable>` snapshot and finish against it, so a
//!   request never observes a half-built table
//! - Routes keep discovery order (first match wins); layers are stable-sorted
//!   by ascending depth

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::discovery::ScanResult;
use crate::error::RouteError;
use crate::middleware::layer::MiddlewareLayer;
use crate::routing::bindings::Bindings;
use crate::routing::route::Route;

/// Compiled routes and middleware layers.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
    layers: Vec<MiddlewareLayer>,
}

impl RoutingTable {
    pub fn new(routes: Vec<Route>, mut layers: Vec<MiddlewareLayer>) -> Self {
        layers.sort_by_key(|layer| layer.depth);
        Self { routes, layers }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn layers(&self) -> &[MiddlewareLayer] {
        &self.layers
    }

    /// Total middleware functions across all layers.
    pub fn middleware_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.functions.len()).sum()
    }

    /// Binds `scan` against `bindings` and compiles the table.
    ///
    /// Files without a binding are skipped and reported rather than failing the load.
    pub fn load(scan: &ScanResult, bindings: &Bindings) -> Result<(Self, LoadReport), RouteError> {
        let mut report = LoadReport::default();
        let mut used_routes = HashSet::new();
        let mut used_middleware = HashSet::new();

        let mut layers = Vec::with_capacity(scan.middleware.len());
        let mut seen_directories = HashSet::new();
        for file in &scan.middleware {
            if !seen_directories.insert(file.key()) {
                tracing::warn!(
                    source_file = %file.source_file,
                    directory = %file.directory,
                    "Directory already has a middleware file; ignoring"
                );
                report.duplicate_middleware.push(file.source_file.clone());
                continue;
            }

            let Some(export) = bindings.middleware_export(file.key()) else {
                tracing::warn!(source_file = %file.source_file, "Middleware file has no binding");
                report.unbound_middleware.push(file.source_file.clone());
                continue;
            };
            used_middleware.insert(file.key());

            let layer = MiddlewareLayer::new(
                file.base_pattern.clone(),
                file.source_file.clone(),
                export.clone(),
            );
            if layer.functions.is_empty() {
                tracing::warn!(source_file = %file.source_file, "Middleware file exports no functions");
                report.empty_middleware.push(file.source_file.clone());
                continue;
            }
            layers.push(layer);
        }

        let mut routes = Vec::with_capacity(scan.routes.len());
        for file in &scan.routes {
            let Some(binding) = bindings.route_binding(file.key()) else {
                tracing::warn!(source_file = %file.source_file, "Route file does not bind a handler");
                report.unbound_routes.push(file.source_file.clone());
                continue;
            };
            used_routes.insert(file.key());

            let mut route = Route::new(
                file.method,
                file.template.clone(),
                file.source_file.clone(),
                binding.handler.clone(),
            )?;
            route.body_schema = binding.body_schema.clone();
            route.query_schema = binding.query_schema.clone();
            route.body_type_hint = binding.body_type_hint.clone();
            route.query_type_hint = binding.query_type_hint.clone();
            routes.push(route);
        }

        report.unused_bindings = bindings
            .route_keys()
            .filter(|key| !used_routes.contains(key))
            .chain(
                bindings
                    .middleware_keys()
                    .filter(|key| !used_middleware.contains(key)),
            )
            .map(str::to_string)
            .collect();
        report.unused_bindings.sort();

        Ok((Self::new(routes, layers), report))
    }
}

/// What a load skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Route files with no bound handler.
    pub unbound_routes: Vec<String>,
    pub unbound_middleware: Vec<String>,
    /// Middleware files whose export was empty.
    pub empty_middleware: Vec<String>,
    /// Extra middleware files in a directory that already has one.
    pub duplicate_middleware: Vec<String>,
    /// Binding keys that matched no discovered file.
    pub unused_bindings: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.unbound_routes.is_empty()
            && self.unbound_middleware.is_empty()
            && self.empty_middleware.is_empty()
            && self.duplicate_middleware.is_empty()
            && self.unused_bindings.is_empty()
    }
}

/// Holds the current routing table.
#[derive(Debug)]
pub struct RouteStore {
    current: ArcSwap<RoutingTable>,
}

impl RouteStore {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    pub fn empty() -> Self {
        Self::new(RoutingTable::default())
    }

    /// The table in effect right now.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.current.load_full()
    }

    /// Publishes `table` for all subsequent snapshots.
    pub fn reload(&self, table: RoutingTable) {
        tracing::info!(
            routes = table.routes().len(),
            middleware = table.middleware_count(),
            "Routing table reloaded"
        );
        self.current.store(Arc::new(table));
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::empty()
    }
}
