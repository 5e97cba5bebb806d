//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the file router.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Directory scanned for route and middleware files.
    pub api_dir: PathBuf,

    /// URL prefix under which routes are served (e.g. "/api").
    pub api_base_path: String,

    /// Validate body and query against bound schemas before the handler runs.
    pub enable_validation: bool,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// File extensions recognized for route and middleware files.
    pub extensions: Vec<String>,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            api_dir: PathBuf::from("src/api"),
            api_base_path: "/api".to_string(),
            enable_validation: false,
            max_body_bytes: 1024 * 1024,
            extensions: vec!["rs".to_string(), "ts".to_string(), "js".to_string()],
            logging: LoggingConfig::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub level: String,

    pub format: LogFormat,

    /// Log every completed request with status and duration.
    pub enable_request_logging: bool,

    /// Log which route pattern each request matched.
    pub enable_route_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
            enable_request_logging: false,
            enable_route_logging: true,
        }
    }
}
