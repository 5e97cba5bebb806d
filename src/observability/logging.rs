//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Emit the router's structured events (routes registered, route matched,
//!   request completed)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, plain format for development
//! - Log level configurable via config; `RUST_LOG` wins when set

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::routing::RoutingTable;

/// Installs the global subscriber, writing to stderr. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = matches!(config.format, LogFormat::Json);
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .try_init()
}

/// Logs every registered route under `base_path`.
pub fn routes_registered(table: &RoutingTable, base_path: &str) {
    for route in table.routes() {
        tracing::debug!(
            method = %route.method,
            path = %format!("{}/{}", base_path.trim_end_matches('/'), route.pattern),
            source_file = %route.source_file,
            "Route registered"
        );
    }
    tracing::info!(routes = table.routes().len(), base_path, "Routes registered");
}

pub fn middleware_loaded(table: &RoutingTable) {
    tracing::info!(
        layers = table.layers().len(),
        functions = table.middleware_count(),
        "Middleware loaded"
    );
}

pub fn route_matched(config: &LoggingConfig, request_id: &str, pattern: &str, method: &str) {
    if config.enable_route_logging {
        tracing::info!(request_id, pattern, method, "Route matched");
    }
}

pub fn request_completed(
    config: &LoggingConfig,
    request_id: &str,
    method: &str,
    path: &str,
    status: u16,
    elapsed: Duration,
) {
    if config.enable_request_logging {
        tracing::info!(
            request_id,
            method,
            path,
            status,
            duration_ms = elapsed.as_millis() as u64,
            "Request completed"
        );
    }
}
