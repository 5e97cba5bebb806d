//! File-based route discovery.
//!
//! # Data Flow
//! ```text
//! api_dir/
//!     → scanner.rs (walk in name order, classify files)
//!     → route_file.rs (file name → method + template, directory → base pattern)
//!     → ScanResult { routes, middleware }
//!     → routing::table binds handlers and compiles the table
//! ```

pub mod route_file;
pub mod scanner;

pub use route_file::{
    middleware_base_pattern, normalize_key, normalize_route_path, parse_middleware_file,
    parse_route_file, MiddlewareFile, RouteFile,
};
pub use scanner::{scan_api_directory, ScanError, ScanResult};
