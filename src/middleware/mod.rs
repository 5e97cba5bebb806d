//! Hierarchical middleware.
//!
//! # Data Flow
//! ```text
//! middleware file per directory
//!     → layer.rs (MiddlewareLayer { functions, base_pattern, depth })
//!     → applicable.rs (layers whose base is a whole-segment prefix of the route)
//!     → compose.rs (onion chain around the route handler)
//! ```
//!
//! # Design Decisions
//! - Generic layers run before specific ones (ascending depth)
//! - Within a layer, functions run in declaration order
//! - A middleware may short-circuit by returning without calling `next`

pub mod applicable;
pub mod compose;
pub mod layer;

pub use applicable::{applicable, applicable_layers, is_applicable};
pub use compose::{compose, Chain, Next};
pub use layer::{from_fn, Middleware, MiddlewareExport, MiddlewareLayer};
