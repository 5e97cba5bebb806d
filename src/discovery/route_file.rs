//! File-name conventions for routes and middleware.
//!
//! # Conventions
//! - Route file: `<path>.<method>.<ext>`, e.g. `users/[id].get.rs`
//! - Middleware file: `middleware.<ext>`, applying to its directory and below
//! - `[name]` becomes `:name`, `[...name]` becomes `*name`
//! - A trailing `index` segment is dropped, so `posts/index.get.rs` serves `posts`
//!
//! Paths are relative to the API directory and use `/` separators.

use serde::Serialize;

use crate::middleware::layer::pattern_depth;
use crate::routing::pattern::extract_params;
use crate::routing::route::HttpMethod;

/// A discovered route file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteFile {
    pub method: HttpMethod,
    /// Route template, e.g. `users/:id` (empty for the root route).
    pub template: String,
    pub param_names: Vec<String>,
    /// Path relative to the API directory.
    pub source_file: String,
}

impl RouteFile {
    /// Binding key: the source path without its extension, e.g. `users/[id].get`.
    pub fn key(&self) -> &str {
        strip_extension(&self.source_file)
    }
}

/// A discovered middleware file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MiddlewareFile {
    pub source_file: String,
    /// Declaring directory relative to the API directory (`""` at the root).
    pub directory: String,
    pub base_pattern: String,
    pub depth: usize,
}

impl MiddlewareFile {
    /// Binding key: the declaring directory.
    pub fn key(&self) -> &str {
        &self.directory
    }
}

/// Normalizes separators and trims surrounding slashes.
pub fn normalize_key(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    }
}

/// Rewrites bracket segments into route tokens.
fn rewrite_brackets(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(']') {
            Some(close) if close > 0 => {
                let inner = &after[..close];
                match inner.strip_prefix("...") {
                    Some(name) if !name.is_empty() => {
                        out.push('*');
                        out.push_str(name);
                    }
                    _ => {
                        out.push(':');
                        out.push_str(inner);
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('[');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Turns a route path (without method and extension) into a template.
pub fn normalize_route_path(path: &str) -> String {
    let path = normalize_key(path);
    let path = match path.rsplit_once('/') {
        Some((parent, "index")) => parent,
        None if path == "index" => "",
        _ => path.as_str(),
    };
    rewrite_brackets(path)
}

/// Template of the directory containing a middleware file.
pub fn middleware_base_pattern(directory: &str) -> String {
    let dir = normalize_key(directory);
    if dir.is_empty() || dir == "." {
        return String::new();
    }
    rewrite_brackets(&dir)
}

fn split_file_name(relative: &str) -> (&str, &str) {
    match relative.rfind('/') {
        Some(i) => (&relative[..i], &relative[i + 1..]),
        None => ("", relative),
    }
}

fn has_extension(name: &str, extensions: &[String]) -> Option<usize> {
    let dot = name.rfind('.')?;
    let ext = &name[dot + 1..];
    extensions.iter().any(|e| e == ext).then_some(dot)
}

/// True for `middleware.<ext>` with an accepted extension.
pub fn is_middleware_file(file_name: &str, extensions: &[String]) -> bool {
    has_extension(file_name, extensions).is_some_and(|dot| &file_name[..dot] == "middleware")
}

/// Parses a relative path as a middleware file.
pub fn parse_middleware_file(relative: &str, extensions: &[String]) -> Option<MiddlewareFile> {
    let relative = normalize_key(relative);
    let (directory, name) = split_file_name(&relative);
    if !is_middleware_file(name, extensions) {
        return None;
    }

    let base_pattern = middleware_base_pattern(directory);
    Some(MiddlewareFile {
        depth: pattern_depth(&base_pattern),
        base_pattern,
        directory: directory.to_string(),
        source_file: relative.clone(),
    })
}

/// Parses a relative path as a route file. Method names are matched lower-case.
pub fn parse_route_file(relative: &str, extensions: &[String]) -> Option<RouteFile> {
    let relative = normalize_key(relative);
    let (_, name) = split_file_name(&relative);
    has_extension(name, extensions)?;

    let without_ext = strip_extension(&relative);
    let (path_part, method_part) = without_ext.rsplit_once('.')?;
    if path_part.is_empty() || path_part.ends_with('/') {
        return None;
    }
    let method = HttpMethod::ALL
        .into_iter()
        .find(|m| m.as_str() == method_part)?;

    let template = normalize_route_path(path_part);
    Some(RouteFile {
        method,
        param_names: extract_params(&template),
        template,
        source_file: relative.clone(),
    })
}
