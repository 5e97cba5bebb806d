//! file-router CLI
//!
//! Inspects an API directory the way the request bridge sees it.
//!
//! ```text
//! file-router routes                      list routes and middleware
//! file-router match GET /api/users/42     explain which route and layers apply
//! file-router request POST /api/posts -b '{"title":"x"}'
//!                                         dry-run a request through the bridge
//! file-router check                       validate config and the directory
//! ```
//!
//! Handlers are not compiled into this binary, so `match` and `request` bind
//! describe-only stand-ins: every route echoes what it received and every
//! middleware records its source file in `locals.middleware`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use file_router::config::{read_config, validate_config, ConfigError, RouterConfig};
use file_router::discovery::{scan_api_directory, ScanResult};
use file_router::http::request::strip_base_path;
use file_router::middleware::applicable_layers;
use file_router::observability::init_logging;
use file_router::routing::{match_route, RoutingTable};
use file_router::{from_fn, handler, ApiService, Bindings, Reply, RouteStore};

#[derive(Parser)]
#[command(name = "file-router")]
#[command(about = "Inspect a file-based API directory", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API directory (overrides `api_dir` from the config).
    #[arg(short, long)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered routes and middleware
    Routes,
    /// Explain which route and middleware a request would hit
    Match { method: String, path: String },
    /// Dry-run a request through the bridge with echo handlers
    Request {
        method: String,
        uri: String,
        /// Request body (sent as JSON).
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Validate the configuration and report unreachable routes
    Check,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => RouterConfig::default(),
    };
    if let Some(dir) = cli.dir {
        config.api_dir = dir;
    }
    if !matches!(cli.command, Commands::Check) {
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    init_logging(&config.logging)?;

    let scan = scan_api_directory(&config.api_dir, &config.extensions)?;

    match cli.command {
        Commands::Routes => print_json(&list_routes(&config, &scan))?,
        Commands::Match { method, path } => {
            let (table, _) = RoutingTable::load(&scan, &describe_bindings(&scan))?;
            print_json(&explain_match(&config, &table, &method, &path))?;
        }
        Commands::Request { method, uri, body } => {
            let (table, _) = RoutingTable::load(&scan, &describe_bindings(&scan))?;
            let service = ApiService::new(Arc::new(RouteStore::new(table)), Arc::new(config));
            print_json(&dry_run(&service, &method, &uri, body).await?)?;
        }
        Commands::Check => {
            let report = check(&config, &scan);
            print_json(&report)?;
            if !report.ok {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn full_path(base: &str, template: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), template)
}

fn list_routes(config: &RouterConfig, scan: &ScanResult) -> Value {
    let routes: Vec<Value> = scan
        .routes
        .iter()
        .map(|r| {
            json!({
                "method": r.method,
                "path": full_path(&config.api_base_path, &r.template),
                "template": r.template,
                "params": r.param_names,
                "source_file": r.source_file,
            })
        })
        .collect();

    json!({
        "api_dir": config.api_dir,
        "base_path": config.api_base_path,
        "routes": routes,
        "middleware": scan.middleware,
    })
}

fn explain_match(config: &RouterConfig, table: &RoutingTable, method: &str, path: &str) -> Value {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let Some(route_path) = strip_base_path(path, &config.api_base_path) else {
        return json!({ "matched": false, "reason": "outside base path" });
    };
    let Some(matched) = match_route(table.routes(), route_path, method) else {
        return json!({ "matched": false, "reason": "no route" });
    };

    let middleware: Vec<&str> = applicable_layers(table.layers(), &matched.route.pattern)
        .map(|layer| layer.source_file.as_str())
        .collect();

    json!({
        "matched": true,
        "method": matched.route.method,
        "template": matched.route.pattern,
        "source_file": matched.route.source_file,
        "params": matched.params,
        "middleware": middleware,
    })
}

async fn dry_run(
    service: &ApiService,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut builder = Request::builder()
        .method(method.to_ascii_uppercase().as_str())
        .uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;

    let response = service.handle(request).await;
    let status = response.status().as_u16();
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    Ok(json!({ "status": status, "headers": headers, "body": body }))
}

#[derive(Serialize)]
struct CheckReport {
    ok: bool,
    config_issues: Vec<String>,
    routes: usize,
    middleware: usize,
    /// Route files shadowed by an earlier file with the same method and template.
    unreachable: Vec<String>,
}

fn check(config: &RouterConfig, scan: &ScanResult) -> CheckReport {
    let config_issues: Vec<String> = validate_config(config)
        .err()
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect();

    let mut seen = HashMap::new();
    let mut unreachable = Vec::new();
    for route in &scan.routes {
        match seen.entry((route.method, route.template.as_str())) {
            Entry::Occupied(first) => unreachable.push(format!(
                "{} (shadowed by {})",
                route.source_file,
                first.get()
            )),
            Entry::Vacant(slot) => {
                slot.insert(route.source_file.as_str());
            }
        }
    }

    CheckReport {
        ok: config_issues.is_empty() && unreachable.is_empty(),
        config_issues,
        routes: scan.routes.len(),
        middleware: scan.middleware.len(),
        unreachable,
    }
}

fn describe_bindings(scan: &ScanResult) -> Bindings {
    let mut bindings = Bindings::new();

    for file in &scan.routes {
        let source = file.source_file.clone();
        let echo = handler(move |ctx| {
            let source = source.clone();
            async move {
                Ok(Reply::data(json!({
                    "source_file": source,
                    "method": ctx.method,
                    "path": ctx.path,
                    "params": ctx.params,
                    "query": ctx.query,
                    "body": ctx.body,
                    "middleware": ctx.local("middleware").unwrap_or_else(|| json!([])),
                })))
            }
        });
        bindings = bindings.handler(file.key(), echo);
    }

    for file in &scan.middleware {
        let source = file.source_file.clone();
        let trace = from_fn(move |ctx, next| {
            let source = source.clone();
            async move {
                ctx.with_locals(|locals| {
                    if let Value::Array(list) = locals.entry("middleware").or_insert_with(|| json!([])) {
                        list.push(Value::String(source));
                    }
                });
                next.run().await
            }
        });
        bindings = bindings.middleware(file.key(), trace);
    }

    bindings
}
