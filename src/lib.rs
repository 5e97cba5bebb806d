//! File-based API routing with hierarchical middleware.
//!
//! Route files under an API directory (`users/[id].get.rs`) become routes
//! (`GET /api/users/:id`); `middleware.*` files apply to their directory and
//! everything below it, generic layers first. The host binds handlers and
//! middleware to discovered files through [`Bindings`], then mounts
//! [`ApiService::into_router`] in its own server.

pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod middleware;
pub mod observability;
pub mod routing;
pub mod validation;

pub use config::RouterConfig;
pub use error::{ApiError, LoadError, RouteError};
pub use http::{ApiService, HandlerResult, Reply, RequestContext, ResponseEnvelope};
pub use middleware::{from_fn, Middleware, MiddlewareExport, Next};
pub use routing::{handler, Bindings, Handler, HttpMethod, RouteBinding, RouteStore, RoutingTable};
pub use validation::{validate, validate_or_throw, ValidationRule, ValidationSchema};
