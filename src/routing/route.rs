//! Route definitions.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::http::context::RequestContext;
use crate::http::response::HandlerResult;
use crate::routing::pattern::{compile, PathPattern};
use crate::validation::ValidationSchema;

/// HTTP methods a route file may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }

    /// Methods whose requests carry a body worth parsing.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a supported method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method `{0}`")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// Terminal request handler.
pub type Handler = Arc<dyn Fn(Arc<RequestContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Wraps an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// A registered route. Immutable once built.
#[derive(Clone)]
pub struct Route {
    /// Path template (e.g. `users/:id`).
    pub pattern: String,
    pub method: HttpMethod,
    /// Parameter names, in capture-group order.
    pub param_names: Vec<String>,
    pub matcher: PathPattern,
    pub handler: Handler,
    /// File the route was discovered from (for debugging).
    pub source_file: String,
    pub body_type_hint: Option<String>,
    pub query_type_hint: Option<String>,
    pub body_schema: Option<ValidationSchema>,
    pub query_schema: Option<ValidationSchema>,
}

impl Route {
    /// Compiles `pattern` and builds the route.
    pub fn new(
        method: HttpMethod,
        pattern: impl Into<String>,
        source_file: impl Into<String>,
        handler: Handler,
    ) -> Result<Self, RouteError> {
        let pattern = pattern.into();
        let matcher = compile(&pattern)?;

        Ok(Self {
            param_names: matcher.params().to_vec(),
            pattern,
            method,
            matcher,
            handler,
            source_file: source_file.into(),
            body_type_hint: None,
            query_type_hint: None,
            body_schema: None,
            query_schema: None,
        })
    }

    pub fn with_body_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.body_type_hint = Some(hint.into());
        self
    }

    pub fn with_query_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.query_type_hint = Some(hint.into());
        self
    }

    pub fn with_body_schema(mut self, schema: ValidationSchema) -> Self {
        self.body_schema = Some(schema);
        self
    }

    pub fn with_query_schema(mut self, schema: ValidationSchema) -> Self {
        self.query_schema = Some(schema);
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("param_names", &self.param_names)
            .field("source_file", &self.source_file)
            .field("body_type_hint", &self.body_type_hint)
            .field("query_type_hint", &self.query_type_hint)
            .finish_non_exhaustive()
    }
}
