//! End-to-end dispatch through the axum router.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;
use tokio::sync::Notify;

use file_router::discovery::ScanResult;
use file_router::http::response;
use file_router::{
    from_fn, handler, ApiError, Bindings, ResponseEnvelope, RouteBinding, RouterConfig,
    RoutingTable, ValidationRule, ValidationSchema,
};

mod common;
use common::{echo, mark, reply_with, router, send, send_raw, service};

#[tokio::test]
async fn test_params_and_query_reach_handler() {
    let bindings = Bindings::new().handler("users/[id].get", echo());
    let app = router(&["users/[id].get.rs"], &bindings);

    let res = send(&app, "GET", "/api/users/42?tag=a&tag=b&page=2", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["method"], "get");
    assert_eq!(res.body["path"], "/api/users/42");
    assert_eq!(res.body["params"], json!({ "id": "42" }));
    assert_eq!(res.body["query"]["tag"], json!(["a", "b"]));
    assert_eq!(res.body["query"]["page"], "2");
    assert!(res.body["body"].is_null());
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let bindings = Bindings::new().handler("users/index.get", reply_with(json!([])));
    let app = router(&["users/index.get.rs"], &bindings);

    let res = send(&app, "GET", "/api/users", None).await;
    assert_eq!(res.status, StatusCode::OK);

    for uri in ["/api/posts", "/users", "/apix/users"] {
        let res = send(&app, "GET", uri, None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(res.body, json!({ "error": "Route not found" }));
    }

    // Wrong method on an existing path is also a plain miss.
    let res = send(&app, "DELETE", "/api/users", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catch_all_and_root_routes() {
    let bindings = Bindings::new()
        .handler("index.get", reply_with(json!({ "root": true })))
        .handler("files/[...path].get", echo());
    let app = router(&["index.get.rs", "files/[...path].get.rs"], &bindings);

    let res = send(&app, "GET", "/api", None).await;
    assert_eq!(res.body, json!({ "root": true }));

    let res = send(&app, "GET", "/api/files/docs/2024/report.pdf", None).await;
    assert_eq!(res.body["params"]["path"], "docs/2024/report.pdf");
}

#[tokio::test]
async fn test_request_bodies() {
    let bindings = Bindings::new().handler("posts/index.post", echo());
    let app = router(&["posts/index.post.rs"], &bindings);

    let res = send(&app, "POST", "/api/posts", Some(json!({ "title": "Hello" }))).await;
    assert_eq!(res.body["body"], json!({ "title": "Hello" }));

    let res = send_raw(&app, "POST", "/api/posts", Some("not json".into()), &[]).await;
    assert_eq!(res.body["body"], "not json");

    let res = send_raw(&app, "POST", "/api/posts", None, &[]).await;
    assert!(res.body["body"].is_null());
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let bindings = Bindings::new().handler("posts/index.post", echo());
    let config = RouterConfig {
        max_body_bytes: 16,
        ..RouterConfig::default()
    };
    let app = service(&["posts/index.post.rs"], &bindings, config).into_router();

    let res = send_raw(&app, "POST", "/api/posts", Some("x".repeat(64)), &[]).await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_middleware_runs_outermost_first() {
    let bindings = Bindings::new()
        .handler("users/[id]/posts.get", echo())
        .handler("health.get", echo())
        .middleware("", mark("root"))
        .middleware("users", vec![mark("users-a"), mark("users-b")])
        .middleware("users/[id]", mark("user"));
    let paths = [
        "middleware.rs",
        "users/middleware.rs",
        "users/[id]/middleware.rs",
        "users/[id]/posts.get.rs",
        "health.get.rs",
    ];
    let app = router(&paths, &bindings);

    let res = send(&app, "GET", "/api/users/7/posts", None).await;
    assert_eq!(
        res.body["trail"],
        json!(["root", "users-a", "users-b", "user"])
    );

    let res = send(&app, "GET", "/api/health", None).await;
    assert_eq!(res.body["trail"], json!(["root"]));
}

#[tokio::test]
async fn test_middleware_short_circuit() {
    let auth = from_fn(|ctx, next| async move {
        if ctx.header("authorization") != Some("Bearer secret") {
            return Err(ApiError::unauthorized("Missing token"));
        }
        next.run().await
    });
    let bindings = Bindings::new()
        .handler("admin/stats.get", reply_with(json!({ "users": 3 })))
        .middleware("admin", auth);
    let app = router(&["admin/middleware.rs", "admin/stats.get.rs"], &bindings);

    let res = send(&app, "GET", "/api/admin/stats", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        res.body,
        json!({
            "error": "UnauthorizedError",
            "message": "Missing token",
            "code": "UNAUTHORIZED",
        })
    );

    let res = send_raw(
        &app,
        "GET",
        "/api/admin/stats",
        None,
        &[("Authorization", "Bearer secret")],
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "users": 3 }));
}

#[tokio::test]
async fn test_middleware_may_reply_directly() {
    let maintenance = from_fn(|_ctx, _next| async move {
        Ok(response::json(json!({ "error": "maintenance" }), 503))
    });
    let bindings = Bindings::new()
        .handler("index.get", reply_with(json!("unreachable")))
        .middleware("", maintenance);
    let app = router(&["middleware.rs", "index.get.rs"], &bindings);

    let res = send(&app, "GET", "/api", None).await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.body, json!({ "error": "maintenance" }));
}

#[tokio::test]
async fn test_double_next_is_500() {
    let greedy = from_fn(|_ctx, next| async move {
        next.run().await?;
        next.run().await
    });
    let bindings = Bindings::new()
        .handler("index.get", reply_with(json!({})))
        .middleware("", greedy);
    let app = router(&["middleware.rs", "index.get.rs"], &bindings);

    let res = send(&app, "GET", "/api", None).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body["code"], "MIDDLEWARE_ERROR");
    assert_eq!(res.body["message"], "next() called multiple times");
}

#[tokio::test]
async fn test_handler_failure_is_generic_500() {
    let failing = handler(|_ctx| async { Err(ApiError::unhandled("database offline")) });
    let bindings = Bindings::new().handler("index.get", failing);
    let app = router(&["index.get.rs"], &bindings);

    let res = send(&app, "GET", "/api", None).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.body,
        json!({ "error": "Internal server error", "message": "database offline" })
    );
}

#[tokio::test]
async fn test_envelope_sets_status_and_headers() {
    let create = handler(|_ctx| async {
        Ok(ResponseEnvelope::new()
            .status(201)
            .header("Location", "/api/posts/9")
            .body(json!({ "id": 9 }))
            .into())
    });
    let bindings = Bindings::new()
        .handler("posts/index.post", create)
        .handler("posts/[id].delete", handler(|_ctx| async { Ok(response::no_content()) }));
    let app = router(&["posts/index.post.rs", "posts/[id].delete.rs"], &bindings);

    let res = send(&app, "POST", "/api/posts", Some(json!({}))).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.headers["location"], "/api/posts/9");
    assert_eq!(res.headers["content-type"], "application/json");
    assert_eq!(res.body, json!({ "id": 9 }));

    let res = send(&app, "DELETE", "/api/posts/9", None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.body.is_null());
}

#[tokio::test]
async fn test_validation_rejects_before_handler() {
    let schema = ValidationSchema::new()
        .field("title", ValidationRule::string().required().min(3.0))
        .field("views", ValidationRule::number());
    let query = ValidationSchema::new().field("draft", ValidationRule::boolean());
    let binding = RouteBinding::new(echo())
        .body_schema(schema)
        .query_schema(query);
    let bindings = Bindings::new().route("posts/index.post", binding);

    let config = RouterConfig {
        enable_validation: true,
        ..RouterConfig::default()
    };
    let app = service(&["posts/index.post.rs"], &bindings, config).into_router();

    let res = send(&app, "POST", "/api/posts", Some(json!({ "title": "Hi", "views": "x" }))).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(
        res.body["errors"]["title"],
        json!(["title must be at least 3 characters"])
    );
    assert_eq!(res.body["errors"]["views"], json!(["views must be a number"]));

    let res = send(&app, "POST", "/api/posts?draft=maybe", Some(json!({ "title": "Hello" }))).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["errors"]["draft"], json!(["draft must be a boolean"]));

    let res = send(&app, "POST", "/api/posts?draft=true", Some(json!({ "title": "Hello" }))).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_schemas_ignored_when_validation_disabled() {
    let binding = RouteBinding::new(echo()).body_schema(
        ValidationSchema::new().field("title", ValidationRule::string().required()),
    );
    let bindings = Bindings::new().route("posts/index.post", binding);
    let app = router(&["posts/index.post.rs"], &bindings);

    let res = send(&app, "POST", "/api/posts", Some(json!({}))).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_header() {
    let bindings = Bindings::new().handler("index.get", reply_with(json!({})));
    let app = router(&["index.get.rs"], &bindings);

    let res = send_raw(&app, "GET", "/api", None, &[("x-request-id", "req-77")]).await;
    assert_eq!(res.headers["x-request-id"], "req-77");

    let res = send(&app, "GET", "/api/missing", None).await;
    assert_eq!(res.headers["x-request-id"].len(), 36);
}

#[tokio::test]
async fn test_in_flight_request_survives_reload() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let slow = {
        let started = started.clone();
        let release = release.clone();
        handler(move |_ctx| {
            let started = started.clone();
            let release = release.clone();
            async move {
                started.notify_one();
                release.notified().await;
                Ok(json!({ "version": 1 }).into())
            }
        })
    };
    let bindings = Bindings::new().handler("slow.get", slow);
    let svc = Arc::new(service(&["slow.get.rs"], &bindings, RouterConfig::default()));

    let in_flight = {
        let svc = svc.clone();
        tokio::spawn(async move {
            let request = axum::http::Request::get("/api/slow")
                .body(axum::body::Body::empty())
                .unwrap();
            svc.handle(request).await
        })
    };
    started.notified().await;

    // Swap in a table without the route while the request is suspended.
    let scan = ScanResult::from_paths(["other.get.rs"], &common::extensions());
    let other = Bindings::new().handler("other.get", reply_with(json!({ "version": 2 })));
    let (table, _) = RoutingTable::load(&scan, &other).unwrap();
    svc.store().reload(table);

    release.notify_one();
    let response = in_flight.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let app = Arc::try_unwrap(svc).unwrap().into_router();
    assert_eq!(send(&app, "GET", "/api/slow", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, "GET", "/api/other", None).await.body, json!({ "version": 2 }));
}
