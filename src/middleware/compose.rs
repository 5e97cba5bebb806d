//! Onion-style middleware composition.
//!
//! # Responsibilities
//! - Run middleware in order around a terminal handler
//! - Hand each middleware a `Next` continuation for the rest of the chain
//! - Reject a continuation that is invoked twice
//!
//! # Design Decisions
//! - Dispatch state lives in one `Arc` per invocation; concurrent requests
//!   never share a cursor
//! - The cursor is an explicit state machine (`Pending`, `Dispatched(i)`,
//!   `Completed`); dispatching an index at or below the one reached fails with
//!   `ApiError::ContinuationInvokedTwice`
//! - Short-circuiting (returning without calling `next`) is not an error
//! - Errors are returned unchanged to every awaiting caller

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::ApiError;
use crate::http::context::RequestContext;
use crate::http::response::HandlerResult;
use crate::middleware::layer::Middleware;

type Terminal = Box<dyn FnOnce() -> BoxFuture<'static, HandlerResult> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Pending,
    Dispatched(usize),
    Completed,
}

struct Dispatch {
    middleware: Arc<[Middleware]>,
    ctx: Arc<RequestContext>,
    cursor: Mutex<Cursor>,
    terminal: Mutex<Option<Terminal>>,
}

impl Dispatch {
    /// Moves the cursor to `index`, refusing to go backwards or stay put.
    fn advance(&self, index: usize) -> Result<(), ApiError> {
        let len = self.middleware.len();
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);

        let reached = match *cursor {
            Cursor::Pending => None,
            Cursor::Dispatched(i) => Some(i),
            Cursor::Completed => Some(len),
        };
        if reached.is_some_and(|r| index <= r) {
            return Err(ApiError::ContinuationInvokedTwice { index });
        }

        *cursor = if index >= len {
            Cursor::Completed
        } else {
            Cursor::Dispatched(index)
        };
        Ok(())
    }

    fn take_terminal(&self) -> Option<Terminal> {
        self.terminal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn dispatch(state: Arc<Dispatch>, index: usize) -> BoxFuture<'static, HandlerResult> {
    async move {
        if let Err(err) = state.advance(index) {
            tracing::error!(
                target: "file_router::protocol",
                index,
                path = %state.ctx.path,
                "Middleware invoked next() more than once"
            );
            return Err(err);
        }

        if index >= state.middleware.len() {
            return match state.take_terminal() {
                Some(terminal) => terminal().await,
                None => Err(ApiError::ContinuationInvokedTwice { index }),
            };
        }

        let middleware = state.middleware[index].clone();
        let next = Next {
            state: state.clone(),
            index: index + 1,
        };
        middleware(state.ctx.clone(), next).await
    }
    .boxed()
}

/// Continuation handed to a middleware.
///
/// `run` dispatches the rest of the chain and resolves to its result. It may be
/// awaited at most once per request; a second call fails the chain.
pub struct Next {
    state: Arc<Dispatch>,
    index: usize,
}

impl Next {
    pub fn run(&self) -> BoxFuture<'static, HandlerResult> {
        dispatch(self.state.clone(), self.index)
    }

    /// Position of the layer this continuation dispatches to.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A composed middleware chain, reusable across requests.
#[derive(Clone)]
pub struct Chain {
    middleware: Arc<[Middleware]>,
}

/// Composes `middleware` into a single chain.
pub fn compose(middleware: Vec<Middleware>) -> Chain {
    Chain {
        middleware: middleware.into(),
    }
}

impl Chain {
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs the chain for one request, ending in `terminal`.
    pub async fn run<F, Fut>(&self, ctx: Arc<RequestContext>, terminal: F) -> HandlerResult
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let terminal: Terminal = Box::new(move || terminal().boxed());
        let state = Arc::new(Dispatch {
            middleware: self.middleware.clone(),
            ctx,
            cursor: Mutex::new(Cursor::Pending),
            terminal: Mutex::new(Some(terminal)),
        });

        dispatch(state, 0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::Reply;
    use crate::middleware::layer::from_fn;
    use crate::routing::route::HttpMethod;
    use serde_json::json;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    fn ctx() -> Arc<RequestContext> {
        Arc::new(RequestContext::new(HttpMethod::Get, "/api/posts"))
    }

    fn recording(label: &'static str, log: Log) -> Middleware {
        from_fn(move |_ctx, next| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("{label}:before"));
                let reply = next.run().await;
                log.lock().unwrap().push(format!("{label}:after"));
                reply
            }
        })
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log: Log = Arc::default();
        let chain = compose(vec![recording("m1", log.clone()), recording("m2", log.clone())]);

        let handler_log = log.clone();
        let reply = chain
            .run(ctx(), move || async move {
                handler_log.lock().unwrap().push("handler".into());
                Ok(json!({ "ok": true }).into())
            })
            .await
            .unwrap();

        assert_eq!(reply, Reply::data(json!({ "ok": true })));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["m1:before", "m2:before", "handler", "m2:after", "m1:after"]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_runs_handler() {
        let reply = compose(Vec::new())
            .run(ctx(), || async { Ok(json!(1).into()) })
            .await
            .unwrap();
        assert_eq!(reply, Reply::data(json!(1)));
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest() {
        let log: Log = Arc::default();
        let gate = from_fn(|_ctx, _next| async { Err(ApiError::unauthorized("no token")) });
        let chain = compose(vec![gate, recording("m2", log.clone())]);

        let handler_log = log.clone();
        let err = chain
            .run(ctx(), move || async move {
                handler_log.lock().unwrap().push("handler".into());
                Ok(json!(null).into())
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code().as_u16(), 401);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_circuit_with_reply() {
        let cached = from_fn(|_ctx, _next| async { Ok(json!({ "cached": true }).into()) });
        let reply = compose(vec![cached])
            .run(ctx(), || async { Ok(json!({ "cached": false }).into()) })
            .await
            .unwrap();
        assert_eq!(reply, Reply::data(json!({ "cached": true })));
    }

    #[tokio::test]
    async fn test_double_next_is_rejected() {
        let calls = Arc::new(Mutex::new(0));
        let twice = from_fn(|_ctx, next| async move {
            let _ = next.run().await;
            next.run().await
        });

        let counter = calls.clone();
        let err = compose(vec![twice])
            .run(ctx(), move || async move {
                *counter.lock().unwrap() += 1;
                Ok(json!(null).into())
            })
            .await
            .unwrap_err();

        assert!(err.is_protocol_violation());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_double_next_in_outer_layer_does_not_rerun_inner() {
        let log: Log = Arc::default();
        let twice = from_fn(|_ctx, next| async move {
            let _ = next.run().await;
            next.run().await
        });
        let chain = compose(vec![twice, recording("inner", log.clone())]);

        let err = chain
            .run(ctx(), || async { Ok(json!(null).into()) })
            .await
            .unwrap_err();

        assert!(err.is_protocol_violation());
        assert_eq!(*log.lock().unwrap(), vec!["inner:before", "inner:after"]);
    }

    #[tokio::test]
    async fn test_errors_propagate_through_outer_layers() {
        let log: Log = Arc::default();
        let chain = compose(vec![recording("outer", log.clone())]);

        let err = chain
            .run(ctx(), || async { Err(ApiError::conflict("taken")) })
            .await
            .unwrap_err();

        assert_eq!(err.status_code().as_u16(), 409);
        assert_eq!(*log.lock().unwrap(), vec!["outer:before", "outer:after"]);
    }

    #[tokio::test]
    async fn test_suspension_keeps_cursor() {
        let slow = from_fn(|ctx, next| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            ctx.set_local("slept", json!(true));
            next.run().await
        });
        let chain = compose(vec![slow.clone(), slow]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let chain = chain.clone();
                tokio::spawn(async move {
                    let ctx = ctx();
                    let seen = ctx.clone();
                    chain
                        .run(ctx, move || async move { Ok(json!(seen.local("slept")).into()) })
                        .await
                })
            })
            .collect();

        for handle in handles {
            let reply = handle.await.unwrap().unwrap();
            assert_eq!(reply, Reply::data(json!(true)));
        }
    }
}
