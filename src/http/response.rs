//! Handler output and its translation into HTTP responses.
//!
//! # Responsibilities
//! - Model what a handler returns (`Reply`)
//! - Render a reply into an axum `Response`
//! - Provide response helpers (`json`, `created`, `redirect`, ...)
//!
//! # Design Decisions
//! - `Reply::Data` is always a 200 JSON response
//! - `Reply::from_value` recognizes an envelope structurally: an object with a
//!   numeric `status`, or with a `headers` object. A data payload that happens
//!   to carry a numeric `status` is therefore read as an envelope; build
//!   `Reply::data` explicitly to avoid that
//! - Envelope status defaults to 200; `Content-Type: application/json` is added
//!   only when a body exists and no content type was given
//! - String bodies are sent as-is, other bodies are JSON-encoded

use std::collections::BTreeMap;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;

/// Outcome of a handler or middleware.
pub type HandlerResult = Result<Reply, ApiError>;

pub type Headers = BTreeMap<String, String>;

/// An explicit response with optional status, headers and body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ResponseEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .extend(headers);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers
            .as_ref()
            .is_some_and(|h| h.keys().any(|k| k.eq_ignore_ascii_case(name)))
    }
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Plain data, sent as a 200 JSON response.
    Data(Value),
    Envelope(ResponseEnvelope),
}

impl Reply {
    pub fn data(value: Value) -> Self {
        Reply::Data(value)
    }

    pub fn envelope(envelope: ResponseEnvelope) -> Self {
        Reply::Envelope(envelope)
    }

    /// True if `value` is shaped like a response envelope.
    pub fn is_envelope(value: &Value) -> bool {
        let Value::Object(map) = value else {
            return false;
        };
        let has_status = map.get("status").is_some_and(Value::is_number);
        let has_headers = map.get("headers").is_some_and(Value::is_object);
        has_status || has_headers
    }

    /// Interprets an arbitrary JSON value, recognizing envelopes by shape.
    pub fn from_value(value: Value) -> Self {
        if !Self::is_envelope(&value) {
            return Reply::Data(value);
        }

        let Value::Object(mut map) = value else {
            return Reply::Data(value);
        };

        // Out-of-range or fractional codes stay invalid.
        let status = map.get("status").and_then(Value::as_f64).map(|s| {
            if s.fract() == 0.0 && (0.0..u16::MAX as f64).contains(&s) {
                s as u16
            } else {
                u16::MAX
            }
        });

        let headers = match map.remove("headers") {
            Some(Value::Object(h)) => Some(
                h.into_iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, v)
                    })
                    .collect(),
            ),
            _ => None,
        };

        Reply::Envelope(ResponseEnvelope {
            status,
            headers,
            body: map.remove("body"),
        })
    }

    /// Status this reply renders with (before status validation).
    pub fn status(&self) -> u16 {
        match self {
            Reply::Data(_) => 200,
            Reply::Envelope(env) => env.status.unwrap_or(200),
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::from_value(value)
    }
}

impl From<ResponseEnvelope> for Reply {
    fn from(envelope: ResponseEnvelope) -> Self {
        Reply::Envelope(envelope)
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body.to_string(),
    )
        .into_response()
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let envelope = match self {
            Reply::Data(value) => return json_response(StatusCode::OK, &value),
            Reply::Envelope(envelope) => envelope,
        };

        let status = match envelope.status {
            None | Some(0) => StatusCode::OK,
            Some(code) => StatusCode::from_u16(code).unwrap_or_else(|_| {
                tracing::warn!(status = code, "Handler returned an invalid status code");
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        };

        let needs_content_type =
            envelope.body.is_some() && !envelope.has_header(header::CONTENT_TYPE.as_str());

        let body = match &envelope.body {
            None => Body::empty(),
            Some(Value::String(s)) => Body::from(s.clone()),
            Some(other) => Body::from(other.to_string()),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in envelope.headers.iter().flatten() {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid response header"),
            }
        }
        if needs_content_type {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        response
    }
}

// Helpers

/// JSON response with an explicit status.
pub fn json(body: Value, status: u16) -> Reply {
    ResponseEnvelope::new()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body)
        .into()
}

pub fn ok(body: Value) -> Reply {
    json(body, 200)
}

pub fn created(body: Value) -> Reply {
    json(body, 201)
}

pub fn no_content() -> Reply {
    ResponseEnvelope::new().status(204).into()
}

fn error_reply(status: u16, body: Option<Value>, default_message: &str) -> Reply {
    json(body.unwrap_or_else(|| json!({ "error": default_message })), status)
}

pub fn bad_request(body: impl Into<Option<Value>>) -> Reply {
    error_reply(400, body.into(), "Bad request")
}

pub fn unauthorized(body: impl Into<Option<Value>>) -> Reply {
    error_reply(401, body.into(), "Unauthorized")
}

pub fn forbidden(body: impl Into<Option<Value>>) -> Reply {
    error_reply(403, body.into(), "Forbidden")
}

pub fn not_found(body: impl Into<Option<Value>>) -> Reply {
    error_reply(404, body.into(), "Not found")
}

pub fn conflict(body: impl Into<Option<Value>>) -> Reply {
    error_reply(409, body.into(), "Conflict")
}

pub fn unprocessable_entity(body: impl Into<Option<Value>>) -> Reply {
    error_reply(422, body.into(), "Validation error")
}

pub fn too_many_requests(body: impl Into<Option<Value>>) -> Reply {
    error_reply(429, body.into(), "Too many requests")
}

pub fn internal_server_error(body: impl Into<Option<Value>>) -> Reply {
    error_reply(500, body.into(), "Internal server error")
}

/// Redirect to `url`: 301/302, or 308/307 when the method must be preserved.
pub fn redirect(url: impl Into<String>, permanent: bool, preserve_method: bool) -> Reply {
    let status = match (permanent, preserve_method) {
        (true, true) => 308,
        (true, false) => 301,
        (false, true) => 307,
        (false, false) => 302,
    };
    ResponseEnvelope::new()
        .status(status)
        .header("Location", url)
        .into()
}
