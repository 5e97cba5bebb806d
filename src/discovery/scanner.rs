//! API directory scanning.
//!
//! # Responsibilities
//! - Walk the API directory and classify route and middleware files
//! - Order middleware from generic to specific
//!
//! # Design Decisions
//! - Directory entries are visited in name order, depth-first, so discovery
//!   order (and therefore route precedence) is reproducible across platforms
//! - A missing API directory yields an empty result, not an error
//! - Files matching neither convention are ignored

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::discovery::route_file::{
    is_middleware_file, parse_middleware_file, parse_route_file, MiddlewareFile, RouteFile,
};

/// Failure while reading the API directory.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Files found under the API directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Route files in discovery order.
    pub routes: Vec<RouteFile>,
    /// Middleware files, ascending depth (stable).
    pub middleware: Vec<MiddlewareFile>,
}

impl ScanResult {
    /// Classifies relative paths without touching the file system.
    pub fn from_paths<I, S>(paths: I, extensions: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = ScanResult::default();
        for path in paths {
            result.classify(path.as_ref(), extensions);
        }
        result.middleware.sort_by_key(|m| m.depth);
        result
    }

    fn classify(&mut self, relative: &str, extensions: &[String]) {
        let file_name = relative.rsplit(['/', '\\']).next().unwrap_or(relative);
        if is_middleware_file(file_name, extensions) {
            if let Some(middleware) = parse_middleware_file(relative, extensions) {
                self.middleware.push(middleware);
            }
        } else if let Some(route) = parse_route_file(relative, extensions) {
            self.routes.push(route);
        }
    }
}

/// Scans `api_dir` recursively.
pub fn scan_api_directory(api_dir: &Path, extensions: &[String]) -> Result<ScanResult, ScanError> {
    if !api_dir.is_dir() {
        tracing::warn!(api_dir = %api_dir.display(), "API directory not found");
        return Ok(ScanResult::default());
    }

    let mut relative_paths = Vec::new();
    walk(api_dir, api_dir, &mut relative_paths)?;

    let result = ScanResult::from_paths(&relative_paths, extensions);
    tracing::debug!(
        api_dir = %api_dir.display(),
        files = relative_paths.len(),
        routes = result.routes.len(),
        middleware = result.middleware.len(),
        "API directory scanned"
    );
    Ok(result)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err)?;

        if file_type.is_dir() {
            walk(root, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::HttpMethod;

    fn exts() -> Vec<String> {
        vec!["rs".into(), "ts".into()]
    }

    #[test]
    fn test_from_paths_classifies_and_orders() {
        let result = ScanResult::from_paths(
            [
                "posts/[id]/middleware.ts",
                "users/[id].get.ts",
                "middleware.ts",
                "posts/middleware.ts",
                "README.md",
                "posts/index.get.ts",
            ],
            &exts(),
        );

        let templates: Vec<(&str, HttpMethod)> = result
            .routes
            .iter()
            .map(|r| (r.template.as_str(), r.method))
            .collect();
        assert_eq!(
            templates,
            vec![("users/:id", HttpMethod::Get), ("posts", HttpMethod::Get)]
        );

        let bases: Vec<&str> = result
            .middleware
            .iter()
            .map(|m| m.base_pattern.as_str())
            .collect();
        assert_eq!(bases, vec!["", "posts", "posts/:id"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let result = scan_api_directory(Path::new("/definitely/not/here"), &exts()).unwrap();
        assert_eq!(result, ScanResult::default());
    }
}
