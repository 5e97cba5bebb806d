//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use file_router::discovery::ScanResult;
use file_router::{
    from_fn, handler, ApiService, Bindings, Handler, Middleware, RouteStore, RouterConfig,
    RoutingTable,
};

pub fn extensions() -> Vec<String> {
    vec!["rs".to_string()]
}

/// Builds a service from relative file paths, without touching the disk.
pub fn service(paths: &[&str], bindings: &Bindings, config: RouterConfig) -> ApiService {
    let scan = ScanResult::from_paths(paths.iter().copied(), &extensions());
    let (table, _) = RoutingTable::load(&scan, bindings).unwrap();
    ApiService::new(Arc::new(RouteStore::new(table)), Arc::new(config))
}

pub fn router(paths: &[&str], bindings: &Bindings) -> Router {
    service(paths, bindings, RouterConfig::default()).into_router()
}

/// Creates empty files for each relative path under `root`.
pub fn write_tree(root: &Path, paths: &[&str]) {
    for relative in paths {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "").unwrap();
    }
}

/// A handler replying with a fixed JSON value.
pub fn reply_with(value: Value) -> Handler {
    handler(move |_ctx| {
        let value = value.clone();
        async move { Ok(value.into()) }
    })
}

/// A handler echoing what the route received.
pub fn echo() -> Handler {
    handler(|ctx| async move {
        Ok(json!({
            "method": ctx.method,
            "path": ctx.path,
            "params": ctx.params,
            "query": ctx.query,
            "body": ctx.body,
            "trail": ctx.local("trail").unwrap_or_else(|| json!([])),
        })
        .into())
    })
}

/// Middleware appending `name` to `locals.trail` before continuing.
pub fn mark(name: &'static str) -> Middleware {
    from_fn(move |ctx, next| async move {
        ctx.with_locals(|locals| {
            if let Value::Array(trail) = locals.entry("trail").or_insert_with(|| json!([])) {
                trail.push(json!(name));
            }
        });
        next.run().await
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Sends one request through `router` and decodes the response body.
pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
    send_raw(router, method, uri, body.map(|b| b.to_string()), &[]).await
}

pub async fn send_raw(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    TestResponse {
        status,
        headers,
        body,
    }
}
