//! Request bridge between axum and the routing engine.
//!
//! # Responsibilities
//! - Create the axum `Router` the host mounts in its own server
//! - Dispatch requests: base-path strip, match, middleware chain, handler
//! - Optional schema validation before the handler
//! - Translate replies and errors into HTTP responses
//! - Observability (request ID, structured logs, metrics)
//!
//! # Design Decisions
//! - The crate never binds a socket; transport belongs to the host
//! - Each request takes one routing-table snapshot and finishes against it
//! - Expected errors (HTTP family, validation) log at warn; protocol
//!   violations log at error under `file_router::protocol`

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::RouterConfig;
use crate::discovery::scan_api_directory;
use crate::error::{ApiError, LoadError};
use crate::http::request::{build_context, request_id, strip_base_path, X_REQUEST_ID};
use crate::middleware::{applicable, compose};
use crate::observability::{logging, metrics};
use crate::routing::{match_route, Bindings, LoadReport, RouteStore, RoutingTable};
use crate::validation::validate_or_throw;

/// Serves the routes of one API directory.
#[derive(Debug)]
pub struct ApiService {
    store: Arc<RouteStore>,
    config: Arc<RouterConfig>,
}

impl ApiService {
    pub fn new(store: Arc<RouteStore>, config: Arc<RouterConfig>) -> Self {
        Self { store, config }
    }

    /// Scans `config.api_dir`, binds it and builds the service.
    pub fn load(config: RouterConfig, bindings: &Bindings) -> Result<(Self, LoadReport), LoadError> {
        let (table, report) = build_table(&config, bindings)?;
        let service = Self::new(Arc::new(RouteStore::new(table)), Arc::new(config));
        Ok((service, report))
    }

    /// Rescans the API directory and swaps in the new table.
    ///
    /// On failure the current table stays in place.
    pub fn reload(&self, bindings: &Bindings) -> Result<LoadReport, LoadError> {
        let (table, report) = build_table(&self.config, bindings)?;
        self.store.reload(table);
        Ok(report)
    }

    pub fn store(&self) -> &Arc<RouteStore> {
        &self.store
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Handles one request end to end.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id(request.headers());
        let method = request.method().as_str().to_ascii_lowercase();
        let path = request.uri().path().to_string();

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path,
        );
        let (pattern, mut response) = self.dispatch(request, &request_id).instrument(span).await;

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }

        let status = response.status().as_u16();
        logging::request_completed(
            &self.config.logging,
            &request_id,
            &method,
            &path,
            status,
            start.elapsed(),
        );
        metrics::record_request(&method, status, pattern.as_deref().unwrap_or("none"), start);

        response
    }

    /// Returns the matched pattern (if any) and the response.
    async fn dispatch(&self, request: Request<Body>, request_id: &str) -> (Option<String>, Response) {
        let Some(route_path) = strip_base_path(request.uri().path(), &self.config.api_base_path)
        else {
            return (None, route_not_found());
        };

        let table = self.store.snapshot();
        let Some(matched) = match_route(table.routes(), route_path, request.method().as_str())
        else {
            tracing::debug!(request_id, "No route matched");
            return (None, route_not_found());
        };

        let route = matched.route.clone();
        let pattern = route.pattern.clone();
        logging::route_matched(&self.config.logging, request_id, &pattern, route.method.as_str());

        let (parts, body) = request.into_parts();
        let ctx = match build_context(
            &parts,
            body,
            route.method,
            matched.params,
            self.config.max_body_bytes,
        )
        .await
        {
            Ok(ctx) => Arc::new(ctx),
            Err(err) => return (Some(pattern), self.render_error(err, request_id)),
        };

        let chain = compose(applicable(table.layers(), &route.pattern));
        let validate = self.config.enable_validation;
        let terminal_ctx = ctx.clone();

        let result = chain
            .run(ctx, move || async move {
                if validate {
                    if let Some(schema) = &route.body_schema {
                        let body = terminal_ctx.body.clone().unwrap_or(Value::Null);
                        validate_or_throw(&body, schema)?;
                    }
                    if let Some(schema) = &route.query_schema {
                        validate_or_throw(&terminal_ctx.query_value(), schema)?;
                    }
                }
                (route.handler)(terminal_ctx).await
            })
            .await;

        let response = match result {
            Ok(reply) => reply.into_response(),
            Err(err) => self.render_error(err, request_id),
        };
        (Some(pattern), response)
    }

    fn render_error(&self, err: ApiError, request_id: &str) -> Response {
        let status = err.status_code().as_u16();
        if err.is_expected() {
            tracing::warn!(request_id, status, error = %err, "HTTP error");
        } else if err.is_protocol_violation() {
            tracing::error!(
                target: "file_router::protocol",
                request_id,
                error = %err,
                "Middleware protocol violation"
            );
        } else {
            tracing::error!(request_id, error = %err, "Error handling request");
        }
        err.into_response()
    }

    /// Builds the axum router that serves every path through this service.
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/", any(handle_request))
            .route("/{*path}", any(handle_request))
            .with_state(Arc::new(self))
            .layer(TraceLayer::new_for_http())
    }
}

fn build_table(
    config: &RouterConfig,
    bindings: &Bindings,
) -> Result<(RoutingTable, LoadReport), LoadError> {
    let scan = scan_api_directory(&config.api_dir, &config.extensions)?;
    let (table, report) = RoutingTable::load(&scan, bindings)?;

    logging::middleware_loaded(&table);
    logging::routes_registered(&table, &config.api_base_path);
    Ok((table, report))
}

fn route_not_found() -> Response {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
        .into_response()
}

async fn handle_request(
    State(service): State<Arc<ApiService>>,
    request: Request<Body>,
) -> Response {
    service.handle(request).await
}
