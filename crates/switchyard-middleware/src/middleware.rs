//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements, and the [`Next`] continuation a stage uses to run the rest
//! of the chain.
//!
//! # Example
//!
//! ```
//! use switchyard_middleware::{BoxFuture, Middleware, Next, Request, ResponseWriter};
//! use switchyard_core::{RequestContext, StageResult};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn invoke<'a>(
//!         &'a self,
//!         request: &'a Request,
//!         response: &'a mut ResponseWriter,
//!         ctx: &'a mut RequestContext,
//!         mut next: Next<'a>,
//!     ) -> BoxFuture<'a, StageResult> {
//!         Box::pin(async move {
//!             tracing::info!(path = %request.uri().path(), "request started");
//!             next.run(request, response, ctx).await?;
//!             tracing::info!(status = ?response.status(), "request finished");
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use crate::outcome::RenderError;
use crate::response::ResponseWriter;
use crate::types::Request;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use switchyard_core::{Misuse, Outcome, PipelineError, RequestContext, StageResult};
use tokio_util::sync::CancellationToken;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The core middleware trait.
///
/// A stage receives the request, the response writer, the shared request
/// context and a [`Next`] continuation.
///
/// # Contract
///
/// - A stage may do work before and after calling `next.run(..)`.
/// - Calling `next` zero times short-circuits the chain. The stage must then
///   write a response or stage an outcome before returning.
/// - Calling `next` a second time is a contract violation; the call fails
///   with [`Misuse::NextCalledTwice`] and the request ends in a 500.
/// - Returning `Err` unwinds the chain immediately. Outer stages see the
///   error from their own `next.run(..)` and should propagate it.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used for logging and fault attribution.
    fn name(&self) -> &'static str;

    /// Processes the request through this stage.
    fn invoke<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut ResponseWriter,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult>;
}

/// Per-invocation bookkeeping shared by every [`Next`] of one request.
pub(crate) struct ChainState {
    misuse: Mutex<Option<Misuse>>,
    fault: Mutex<Option<PipelineError>>,
    terminal_reached: AtomicBool,
    cancellation: CancellationToken,
}

impl ChainState {
    pub(crate) fn new(cancellation: CancellationToken) -> Self {
        Self {
            misuse: Mutex::new(None),
            fault: Mutex::new(None),
            terminal_reached: AtomicBool::new(false),
            cancellation,
        }
    }

    /// Keeps the first misuse; later ones are consequences of it.
    fn record_misuse(&self, misuse: Misuse) {
        let mut slot = self.misuse.lock();
        if slot.is_none() {
            *slot = Some(misuse);
        }
    }

    pub(crate) fn take_misuse(&self) -> Option<Misuse> {
        self.misuse.lock().take()
    }

    /// Keeps a copy of the first fault seen, so it survives a stage that
    /// catches it and carries on.
    fn record_fault(&self, error: &PipelineError) {
        let PipelineError::Fault { stage, source } = error else {
            return;
        };
        let mut slot = self.fault.lock();
        if slot.is_none() {
            *slot = Some(PipelineError::Fault {
                stage: *stage,
                source: anyhow::anyhow!("{source:#}"),
            });
        }
    }

    pub(crate) fn take_fault(&self) -> Option<PipelineError> {
        self.fault.lock().take()
    }

    pub(crate) fn terminal_reached(&self) -> bool {
        self.terminal_reached.load(Ordering::Acquire)
    }
}

/// Continuation that runs the remainder of the chain.
///
/// Each stage gets its own `Next`, bound to the stages after it. Past the
/// last stage, `run` returns immediately; if nothing has written a
/// response by then the pipeline reports [`Misuse::ChainExhausted`].
pub struct Next<'a> {
    chain: &'a [BoxedMiddleware],
    state: &'a ChainState,
    caller: &'static str,
    called: bool,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        chain: &'a [BoxedMiddleware],
        state: &'a ChainState,
        caller: &'static str,
    ) -> Self {
        Self {
            chain,
            state,
            caller,
            called: false,
        }
    }

    /// Returns `true` once `run` has been called.
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.called
    }

    /// Returns the number of stages left in the chain.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Invokes the next stage in the chain.
    ///
    /// # Errors
    ///
    /// - [`Misuse::NextCalledTwice`] if called more than once
    /// - [`PipelineError::Cancelled`] if the request was cancelled
    /// - whatever error a downstream stage returned
    pub async fn run(
        &mut self,
        request: &Request,
        response: &mut ResponseWriter,
        ctx: &mut RequestContext,
    ) -> StageResult {
        if self.called {
            let misuse = Misuse::NextCalledTwice { stage: self.caller };
            tracing::error!(
                stage = self.caller,
                request_id = %ctx.request_id(),
                "next called more than once"
            );
            self.state.record_misuse(misuse.clone());
            return Err(misuse.into());
        }
        self.called = true;

        if self.state.cancellation.is_cancelled() {
            tracing::debug!(
                stage = self.caller,
                request_id = %ctx.request_id(),
                "request cancelled, not advancing"
            );
            return Err(PipelineError::Cancelled);
        }

        let Some((stage, rest)) = self.chain.split_first() else {
            self.state.terminal_reached.store(true, Ordering::Release);
            return Ok(());
        };

        let name = stage.name();
        tracing::trace!(stage = name, request_id = %ctx.request_id(), "entering stage");

        let state = self.state;
        let next = Next::new(rest, state, name);
        stage
            .invoke(request, response, ctx, next)
            .await
            .map_err(|e| {
                let e = e.attributed_to(name);
                state.record_fault(&e);
                e
            })
    }
}

/// A middleware built from a closure.
///
/// The closure must return a boxed future; `Box::pin(async move { .. })`
/// is the usual shape.
///
/// # Example
///
/// ```
/// use switchyard_middleware::FnMiddleware;
///
/// let timing = FnMiddleware::new("timing", |request, response, ctx, mut next| {
///     Box::pin(async move {
///         let start = std::time::Instant::now();
///         next.run(request, response, ctx).await?;
///         tracing::debug!(elapsed = ?start.elapsed(), "downstream finished");
///         Ok(())
///     })
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a Request,
            &'a mut ResponseWriter,
            &'a mut RequestContext,
            Next<'a>,
        ) -> BoxFuture<'a, StageResult>
        + Send
        + Sync
        + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a Request,
            &'a mut ResponseWriter,
            &'a mut RequestContext,
            Next<'a>,
        ) -> BoxFuture<'a, StageResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn invoke<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut ResponseWriter,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        (self.func)(request, response, ctx, next)
    }
}

/// A terminal stage that turns an [`Outcome`] into the response.
///
/// Built with [`handler`]. It never calls `next`.
pub struct HandlerMiddleware<F, T, E> {
    name: &'static str,
    func: F,
    _outcome: PhantomData<fn() -> (T, E)>,
}

/// Adapts an outcome-returning function into a terminal stage.
///
/// # Example
///
/// ```
/// use switchyard_core::Outcome;
/// use switchyard_middleware::handler;
///
/// let greet = handler("greet", |_request, ctx| {
///     Box::pin(async move {
///         match ctx.get_typed::<String>("user") {
///             Some(user) => Outcome::success(format!("hello {user}")),
///             None => Outcome::failure_with_status(
///                 anyhow::anyhow!("no user"),
///                 http::StatusCode::UNAUTHORIZED,
///             ),
///         }
///     })
/// });
/// ```
pub fn handler<F, T, E>(name: &'static str, func: F) -> HandlerMiddleware<F, T, E>
where
    F: for<'a> Fn(&'a Request, &'a mut RequestContext) -> BoxFuture<'a, Outcome<T, E>>
        + Send
        + Sync
        + 'static,
    T: Serialize + Send + 'static,
    E: RenderError + Send + 'static,
{
    HandlerMiddleware {
        name,
        func,
        _outcome: PhantomData,
    }
}

impl<F, T, E> Middleware for HandlerMiddleware<F, T, E>
where
    F: for<'a> Fn(&'a Request, &'a mut RequestContext) -> BoxFuture<'a, Outcome<T, E>>
        + Send
        + Sync
        + 'static,
    T: Serialize + Send + 'static,
    E: RenderError + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn invoke<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut ResponseWriter,
        ctx: &'a mut RequestContext,
        _next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let outcome = (self.func)(request, ctx).await;
            let request_id = ctx.request_id().to_string();
            response.write_outcome(outcome, Some(&request_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    struct TestMiddleware {
        name: &'static str,
    }

    impl Middleware for TestMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn invoke<'a>(
            &'a self,
            request: &'a Request,
            response: &'a mut ResponseWriter,
            ctx: &'a mut RequestContext,
            mut next: Next<'a>,
        ) -> BoxFuture<'a, StageResult> {
            Box::pin(async move {
                ctx.set(format!("visited:{}", self.name), true);
                next.run(request, response, ctx).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn chain(stages: Vec<BoxedMiddleware>) -> (Vec<BoxedMiddleware>, ChainState) {
        (stages, ChainState::new(CancellationToken::new()))
    }

    #[test]
    fn test_middleware_name() {
        let mw = TestMiddleware { name: "test" };
        assert_eq!(mw.name(), "test");
    }

    #[tokio::test]
    async fn test_empty_chain_marks_terminal() {
        let (stages, state) = chain(Vec::new());
        let mut next = Next::new(&stages, &state, "entry");
        let mut response = ResponseWriter::new();
        let mut ctx = RequestContext::new();

        next.run(&request(), &mut response, &mut ctx).await.unwrap();
        assert!(state.terminal_reached());
        assert!(next.is_called());
    }

    #[tokio::test]
    async fn test_chain_visits_every_stage() {
        let (stages, state) = chain(vec![
            Arc::new(TestMiddleware { name: "first" }),
            Arc::new(TestMiddleware { name: "second" }),
        ]);
        let mut next = Next::new(&stages, &state, "entry");
        assert_eq!(next.remaining(), 2);

        let mut response = ResponseWriter::new();
        let mut ctx = RequestContext::new();
        next.run(&request(), &mut response, &mut ctx).await.unwrap();

        assert_eq!(ctx.get_typed::<bool>("visited:first"), Some(&true));
        assert_eq!(ctx.get_typed::<bool>("visited:second"), Some(&true));
        assert!(state.terminal_reached());
    }

    #[tokio::test]
    async fn test_second_run_is_misuse() {
        let (stages, state) = chain(Vec::new());
        let mut next = Next::new(&stages, &state, "greedy");
        let request = request();
        let mut response = ResponseWriter::new();
        let mut ctx = RequestContext::new();

        next.run(&request, &mut response, &mut ctx).await.unwrap();
        let err = next.run(&request, &mut response, &mut ctx).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Misuse(Misuse::NextCalledTwice { stage: "greedy" })
        ));
        assert_eq!(
            state.take_misuse(),
            Some(Misuse::NextCalledTwice { stage: "greedy" })
        );
    }

    #[tokio::test]
    async fn test_cancelled_chain_does_not_advance() {
        let token = CancellationToken::new();
        let stages: Vec<BoxedMiddleware> = vec![Arc::new(TestMiddleware { name: "never" })];
        let state = ChainState::new(token.clone());
        token.cancel();

        let mut next = Next::new(&stages, &state, "entry");
        let mut response = ResponseWriter::new();
        let mut ctx = RequestContext::new();
        let err = next.run(&request(), &mut response, &mut ctx).await.unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(!ctx.contains("visited:never"));
    }

    #[tokio::test]
    async fn test_fault_attributed_to_stage() {
        let failing = FnMiddleware::new("db", |_request, _response, _ctx, _next| {
            Box::pin(async move { Err(anyhow::anyhow!("connection refused").into()) })
        });
        let (stages, state) = chain(vec![
            Arc::new(TestMiddleware { name: "outer" }),
            Arc::new(failing),
        ]);

        let mut next = Next::new(&stages, &state, "entry");
        let mut response = ResponseWriter::new();
        let mut ctx = RequestContext::new();
        let err = next.run(&request(), &mut response, &mut ctx).await.unwrap_err();

        assert_eq!(err.stage(), Some("db"));
    }

    #[tokio::test]
    async fn test_handler_writes_outcome() {
        let greet = handler("greet", |_request, ctx| {
            Box::pin(async move {
                let user = ctx.get_typed::<String>("user").cloned().unwrap_or_default();
                let outcome: Outcome<String> =
                    Outcome::success_with_status(format!("hello {user}"), StatusCode::CREATED);
                outcome
            })
        });
        let (stages, state) = chain(vec![Arc::new(greet)]);

        let mut next = Next::new(&stages, &state, "entry");
        let mut response = ResponseWriter::new();
        let mut ctx = RequestContext::new();
        ctx.set("user", "alice".to_string());
        next.run(&request(), &mut response, &mut ctx).await.unwrap();

        assert_eq!(response.status(), Some(StatusCode::CREATED));
        assert!(!state.terminal_reached());
    }
}
