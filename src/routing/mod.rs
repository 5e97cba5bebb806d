//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table construction (at load):
//!     ScanResult + Bindings
//!     → table.rs (bind handlers, skip and report unbound files)
//!     → pattern.rs (compile each template to an anchored regex)
//!     → RoutingTable (immutable) → RouteStore (atomic swap)
//!
//! Incoming request (method, path):
//!     → RouteStore::snapshot()
//!     → matcher.rs (filter by method, first regex match wins)
//!     → Return: RouteMatch { route, params } or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at load, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins in discovery order; there is no specificity ranking

pub mod bindings;
pub mod matcher;
pub mod pattern;
pub mod route;
pub mod table;

pub use bindings::{Bindings, RouteBinding};
pub use matcher::{match_route, RouteMatch};
pub use pattern::{compile, extract_params, PathPattern};
pub use route::{handler, Handler, HttpMethod, Route};
pub use table::{LoadReport, RouteStore, RoutingTable};
