//! Request parsing for the bridge.
//!
//! # Responsibilities
//! - Assign a request ID (reuse `x-request-id` or generate a UUID v4)
//! - Strip the API base path before matching
//! - Turn headers and body into the shapes `RequestContext` carries
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Bodies are read only for POST, PUT and PATCH, up to `max_body_bytes`
//! - A body that is not JSON is kept as a string; an empty body is absent
//! - Repeated headers are joined with ", "

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{request::Parts, HeaderMap, StatusCode},
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::context::RequestContext;
use crate::routing::route::HttpMethod;

pub const X_REQUEST_ID: &str = "x-request-id";

/// The caller's request ID, or a fresh UUID v4.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Path relative to `base`, or `None` when the request is outside it.
///
/// The base must end at a segment boundary: with base `/api`, `/api` and
/// `/api/users` are inside, `/apix` is not.
pub fn strip_base_path<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }

    match path.strip_prefix(base)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

/// Flattens headers into lower-case names; repeated values are joined.
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    out
}

/// Reads and decodes a request body.
pub async fn read_body(body: Body, limit: usize) -> Result<Option<Value>, ApiError> {
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|err| {
        tracing::warn!(limit, error = %err, "Failed to read request body");
        ApiError::http(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            format!("Request body exceeds {limit} bytes"),
        )
    })?;

    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    })))
}

/// Builds the context for a matched request.
pub async fn build_context(
    parts: &Parts,
    body: Body,
    method: HttpMethod,
    params: BTreeMap<String, String>,
    max_body_bytes: usize,
) -> Result<RequestContext, ApiError> {
    let body = if method.has_body() {
        read_body(body, max_body_bytes).await?
    } else {
        None
    };

    Ok(RequestContext::new(method, parts.uri.to_string())
        .with_params(params)
        .with_headers(collect_headers(&parts.headers))
        .with_body(body))
}
