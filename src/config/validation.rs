//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and formats (base path, body limit, log level)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ConfigIssue>>

use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::config::schema::RouterConfig;

/// One semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    let base = &config.api_base_path;
    if !base.is_empty() && !base.starts_with('/') {
        issues.push(ConfigIssue::new("api_base_path", "must start with '/'"));
    }
    if base.len() > 1 && base.ends_with('/') {
        issues.push(ConfigIssue::new("api_base_path", "must not end with '/'"));
    }

    if config.api_dir.as_os_str().is_empty() {
        issues.push(ConfigIssue::new("api_dir", "must not be empty"));
    }

    if config.max_body_bytes == 0 {
        issues.push(ConfigIssue::new("max_body_bytes", "must be greater than 0"));
    }

    if config.extensions.is_empty() {
        issues.push(ConfigIssue::new("extensions", "must list at least one extension"));
    }
    for ext in &config.extensions {
        if ext.is_empty() || ext.contains('.') || ext.contains('/') {
            issues.push(ConfigIssue::new(
                "extensions",
                format!("invalid extension '{ext}' (use e.g. \"rs\")"),
            ));
        }
    }

    if EnvFilter::try_new(&config.logging.level).is_err() {
        issues.push(ConfigIssue::new(
            "logging.level",
            format!("invalid filter '{}'", config.logging.level),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
