//! Per-request context shared through the middleware chain.
//!
//! # Responsibilities
//! - Hold the parsed request (method, path, query, params, headers, body)
//! - Carry `locals` written by middleware for downstream layers
//!
//! # Design Decisions
//! - Created fresh per request and shared as `Arc<RequestContext>`
//! - Request data is immutable once the chain starts; only `locals` changes
//! - A repeated query key upgrades to `QueryValue::Multi` in arrival order

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::routing::route::HttpMethod;

const PARSE_BASE: &str = "http://localhost";

/// A query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    /// First value for the key.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(v) => Some(v),
            QueryValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Multi(vec![first, value]);
            }
            QueryValue::Multi(values) => values.push(value),
        }
    }
}

pub type Query = BTreeMap<String, QueryValue>;

/// Parses the query string of `url` (absolute or origin-form).
pub fn parse_query(url: &str) -> Query {
    let mut query = Query::new();
    let Ok(parsed) = Url::parse(PARSE_BASE).and_then(|base| base.join(url)) else {
        return query;
    };

    for (key, value) in parsed.query_pairs() {
        let value = value.into_owned();
        match query.get_mut(key.as_ref()) {
            Some(existing) => existing.push(value),
            None => {
                query.insert(key.into_owned(), QueryValue::Single(value));
            }
        }
    }
    query
}

/// Path component of `url`, as sent (not percent-decoded).
fn path_of(url: &str) -> String {
    Url::parse(PARSE_BASE)
        .and_then(|base| base.join(url))
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| {
            let end = url.find(['?', '#']).unwrap_or(url.len());
            url[..end].to_string()
        })
}

/// The request as seen by middleware and handlers.
#[derive(Debug)]
pub struct RequestContext {
    pub url: String,
    pub method: HttpMethod,
    pub path: String,
    pub query: Query,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    locals: Mutex<Map<String, Value>>,
}

impl RequestContext {
    /// Builds a context from a method and URL; `path` and `query` are derived.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            path: path_of(&url),
            query: parse_query(&url),
            url,
            method,
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            locals: Mutex::new(Map::new()),
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Header lookup; names are stored lower-case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Query as a JSON object, for validation.
    pub fn query_value(&self) -> Value {
        serde_json::to_value(&self.query).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    pub fn set_local(&self, key: impl Into<String>, value: Value) {
        self.locals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    pub fn local(&self, key: &str) -> Option<Value> {
        self.locals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Runs `f` with mutable access to the locals map.
    pub fn with_locals<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        let mut locals = self.locals.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut locals)
    }

    pub fn locals(&self) -> Map<String, Value> {
        self.locals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_and_query_derived_from_url() {
        let ctx = RequestContext::new(HttpMethod::Get, "/api/users/42?page=2&tag=a&tag=b");
        assert_eq!(ctx.path, "/api/users/42");
        assert_eq!(ctx.query["page"], QueryValue::Single("2".into()));
        assert_eq!(
            ctx.query["tag"],
            QueryValue::Multi(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_absolute_url() {
        let ctx = RequestContext::new(HttpMethod::Get, "http://example.com/a/b?x=1");
        assert_eq!(ctx.path, "/a/b");
        assert_eq!(ctx.query["x"].first(), Some("1"));
    }

    #[test]
    fn test_path_is_not_decoded() {
        let ctx = RequestContext::new(HttpMethod::Get, "/files/a%20b");
        assert_eq!(ctx.path, "/files/a%20b");
    }

    #[test]
    fn test_query_value_serializes_multi_as_array() {
        let ctx = RequestContext::new(HttpMethod::Get, "/?a=1&b=2&b=3");
        assert_eq!(ctx.query_value(), json!({ "a": "1", "b": ["2", "3"] }));
    }

    #[test]
    fn test_locals() {
        let ctx = RequestContext::new(HttpMethod::Post, "/");
        assert!(ctx.local("user").is_none());
        ctx.set_local("user", json!({ "id": 1 }));
        assert_eq!(ctx.local("user"), Some(json!({ "id": 1 })));

        let count = ctx.with_locals(|locals| {
            locals.insert("trace".into(), json!("t-1"));
            locals.len()
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), "Bearer x".to_string());
        let ctx = RequestContext::new(HttpMethod::Get, "/").with_headers(headers);
        assert_eq!(ctx.header("Authorization"), Some("Bearer x"));
    }
}
