//! Middleware functions and directory-scoped layers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use crate::http::context::RequestContext;
use crate::http::response::HandlerResult;
use crate::middleware::compose::Next;

/// A middleware function. Call `next.run()` to continue the chain, or return
/// without calling it to short-circuit.
pub type Middleware = Arc<dyn Fn(Arc<RequestContext>, Next) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Wraps an async closure as a [`Middleware`].
///
/// ```rust,ignore
/// let timing = from_fn(|ctx, next| async move {
///     let started = Instant::now();
///     let reply = next.run().await;
///     tracing::debug!(path = %ctx.path, elapsed = ?started.elapsed(), "done");
///     reply
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Arc<RequestContext>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx, next| f(ctx, next).boxed())
}

/// What a middleware file exports: one function or an ordered list.
#[derive(Clone)]
pub enum MiddlewareExport {
    Single(Middleware),
    List(Vec<Middleware>),
}

impl MiddlewareExport {
    /// Normalizes the export into an ordered list.
    pub fn into_functions(self) -> Vec<Middleware> {
        match self {
            MiddlewareExport::Single(m) => vec![m],
            MiddlewareExport::List(list) => list,
        }
    }
}

impl From<Middleware> for MiddlewareExport {
    fn from(m: Middleware) -> Self {
        MiddlewareExport::Single(m)
    }
}

impl From<Vec<Middleware>> for MiddlewareExport {
    fn from(list: Vec<Middleware>) -> Self {
        MiddlewareExport::List(list)
    }
}

/// Number of segments in a base pattern; 0 for the global scope.
pub fn pattern_depth(base_pattern: &str) -> usize {
    let trimmed = base_pattern.trim_matches('/');
    if trimmed.is_empty() {
        0
    } else {
        trimmed.split('/').count()
    }
}

/// Middleware declared by one directory.
#[derive(Clone)]
pub struct MiddlewareLayer {
    pub functions: Vec<Middleware>,
    /// Template of the declaring directory (`""` is global).
    pub base_pattern: String,
    pub depth: usize,
    pub source_file: String,
}

impl MiddlewareLayer {
    pub fn new(
        base_pattern: impl Into<String>,
        source_file: impl Into<String>,
        export: impl Into<MiddlewareExport>,
    ) -> Self {
        let base_pattern = base_pattern.into();
        Self {
            depth: pattern_depth(&base_pattern),
            functions: export.into().into_functions(),
            base_pattern,
            source_file: source_file.into(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.base_pattern.is_empty()
    }
}

impl fmt::Debug for MiddlewareLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareLayer")
            .field("functions", &self.functions.len())
            .field("base_pattern", &self.base_pattern)
            .field("depth", &self.depth)
            .field("source_file", &self.source_file)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough() -> Middleware {
        from_fn(|_ctx, next| async move { next.run().await })
    }

    #[test]
    fn test_depth() {
        assert_eq!(pattern_depth(""), 0);
        assert_eq!(pattern_depth("posts"), 1);
        assert_eq!(pattern_depth("posts/:id"), 2);
        assert_eq!(pattern_depth("/posts/:id/"), 2);
    }

    #[test]
    fn test_export_normalization() {
        assert_eq!(MiddlewareExport::from(passthrough()).into_functions().len(), 1);
        assert_eq!(
            MiddlewareExport::from(vec![passthrough(), passthrough()]).into_functions().len(),
            2
        );
        assert!(MiddlewareExport::List(Vec::new()).into_functions().is_empty());
    }

    #[test]
    fn test_layer_new() {
        let layer = MiddlewareLayer::new("users/:id", "users/[id]/middleware.rs", passthrough());
        assert_eq!(layer.depth, 2);
        assert!(!layer.is_global());
        assert!(MiddlewareLayer::new("", "middleware.rs", vec![passthrough()]).is_global());
    }
}
