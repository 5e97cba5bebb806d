//! Error taxonomy for routing, dispatch and validation.
//!
//! # Responsibilities
//! - Typed request failures (`ApiError`) that render straight into responses
//! - Registration-time failures for routes (`RouteError`, `LoadError`)
//!
//! # Design Decisions
//! - HTTP-family and validation errors are expected outcomes and carry their
//!   own status code and machine-readable code
//! - A continuation invoked twice is a programming defect; it renders as a
//!   500 but stays a distinct variant so logs can tell it apart
//! - Anything else is `Unhandled` and renders as a generic 500

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Failures raised while serving a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A deliberate HTTP failure (400, 401, 403, 404, 409, 429, 500...).
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },

    /// Request data failed its validation schema (422).
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    /// A middleware called `next` more than once.
    #[error("next() called multiple times")]
    ContinuationInvokedTwice { index: usize },

    /// Any other failure surfaced by a handler or middleware.
    #[error("{0}")]
    Unhandled(String),
}

impl ApiError {
    pub fn http(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::http(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::http(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::http(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::http(StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_REQUESTS", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::http(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    pub fn validation(errors: FieldErrors) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            errors,
        }
    }

    pub fn unhandled(message: impl std::fmt::Display) -> Self {
        Self::Unhandled(message.to_string())
    }

    /// HTTP status this error renders with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Http { status, .. } => *status,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ContinuationInvokedTwice { .. } | Self::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code, when the error carries one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Http { code, .. } => Some(code),
            Self::Validation { .. } => Some("VALIDATION_ERROR"),
            Self::ContinuationInvokedTwice { .. } => Some("MIDDLEWARE_ERROR"),
            Self::Unhandled(_) => None,
        }
    }

    /// Display name used in the `error` field of the response body.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Http { status, .. } => match *status {
                StatusCode::BAD_REQUEST => "BadRequestError",
                StatusCode::UNAUTHORIZED => "UnauthorizedError",
                StatusCode::FORBIDDEN => "ForbiddenError",
                StatusCode::NOT_FOUND => "NotFoundError",
                StatusCode::CONFLICT => "ConflictError",
                StatusCode::TOO_MANY_REQUESTS => "TooManyRequestsError",
                StatusCode::INTERNAL_SERVER_ERROR => "InternalServerError",
                _ => "HttpError",
            },
            Self::Validation { .. } => "ValidationError",
            Self::ContinuationInvokedTwice { .. } => "MiddlewareError",
            Self::Unhandled(_) => "Internal server error",
        }
    }

    /// True for typed outcomes (HTTP family and validation) as opposed to defects.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Validation { .. })
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ContinuationInvokedTwice { .. })
    }

    /// Field errors carried by a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Http { .. } => json!({
                "error": self.name(),
                "message": self.to_string(),
                "code": self.code(),
            }),
            Self::Validation { errors, .. } => json!({
                "error": self.name(),
                "message": self.to_string(),
                "code": self.code(),
                "errors": errors,
            }),
            Self::ContinuationInvokedTwice { .. } => json!({
                "error": "Internal server error",
                "message": self.to_string(),
                "code": self.code(),
            }),
            Self::Unhandled(message) => json!({
                "error": "Internal server error",
                "message": message,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unhandled(err.to_string())
    }
}

/// Failures raised while registering routes.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The template produced a pattern the regex engine rejected.
    #[error("invalid route template `{template}`: {source}")]
    InvalidTemplate {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// Failures while building a routing table from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Scan(#[from] crate::discovery::ScanError),

    #[error(transparent)]
    Route(#[from] RouteError),
}
