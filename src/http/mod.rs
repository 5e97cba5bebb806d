//! HTTP bridge subsystem.
//!
//! # Data Flow
//! ```text
//! Host server (axum, hyper, ...)
//!     → server.rs (request ID, base-path strip, route match)
//!     → request.rs (headers, body → RequestContext)
//!     → middleware chain → handler
//!     → response.rs (Reply → status, headers, body)
//!     → Send to client
//! ```

pub mod context;
pub mod request;
pub mod response;
pub mod server;

pub use context::{parse_query, Query, QueryValue, RequestContext};
pub use request::X_REQUEST_ID;
pub use response::{HandlerResult, Reply, ResponseEnvelope};
pub use server::ApiService;
