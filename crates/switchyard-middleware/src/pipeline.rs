//! Ordered middleware pipeline.
//!
//! A [`Pipeline`] is an immutable, ordered list of stages. For each request
//! it creates a fresh [`RequestContext`] and [`ResponseWriter`], runs the
//! chain, and resolves whatever state the chain left behind into exactly
//! one response.
//!
//! ## Resolution
//!
//! After the chain unwinds the pipeline picks the response in this order:
//!
//! 1. A contract violation was recorded: 500 `PIPELINE_MISUSE`, discarding
//!    any written response.
//! 2. A stage faulted or panicked: the written response if there is one,
//!    otherwise 500 `INTERNAL_ERROR`.
//! 3. The request was cancelled: 503 `REQUEST_CANCELLED`.
//! 4. A response was written: sent as is.
//! 5. An outcome was staged in the context: rendered and sent.
//! 6. The end of the chain was reached with nothing written: 500
//!    `PIPELINE_MISUSE` ([`Misuse::ChainExhausted`]).
//! 7. A stage stopped the chain without writing anything: 500
//!    `PIPELINE_MISUSE` ([`Misuse::NoResponse`]).
//!
//! Every error is reported to the pipeline's [`FaultObserver`].

use crate::middleware::{BoxedMiddleware, ChainState, Middleware, Next};
use crate::observer::{FaultObserver, TracingObserver};
use crate::outcome::ContextExt;
use crate::response::ResponseWriter;
use crate::types::{Request, Response, ResponseExt};
use futures_util::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use switchyard_core::{Misuse, PipelineError, RequestContext, StageResult};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Caller name used for the entry continuation.
const ENTRY: &str = "pipeline";

/// The terminal state of one request.
#[derive(Debug)]
pub struct Dispatch {
    /// The single response for the request.
    pub response: Response,
    /// The error the pipeline contained, if any.
    pub error: Option<PipelineError>,
    /// The request context as the chain left it.
    pub context: RequestContext,
}

/// An ordered middleware pipeline.
///
/// The pipeline holds no per-request state and can be shared across tasks.
///
/// # Example
///
/// ```
/// use switchyard_core::Outcome;
/// use switchyard_middleware::{handler, FnMiddleware, Pipeline};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pipeline = Pipeline::builder()
///     .stage(FnMiddleware::new("auth", |request, response, ctx, mut next| {
///         Box::pin(async move {
///             ctx.set("user", "alice".to_string());
///             next.run(request, response, ctx).await
///         })
///     }))
///     .stage(handler("greet", |_request, ctx| {
///         Box::pin(async move {
///             let user = ctx.get_typed::<String>("user").cloned().unwrap_or_default();
///             let outcome: Outcome<String> = Outcome::success(format!("hello {user}"));
///             outcome
///         })
///     }))
///     .build();
///
/// let request = http::Request::new(http_body_util::Full::new(bytes::Bytes::new()));
/// let response = pipeline.handle(request).await;
/// assert_eq!(response.status(), http::StatusCode::OK);
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
    observer: Arc<dyn FaultObserver>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request and returns its response.
    pub async fn handle(&self, request: Request) -> Response {
        self.handle_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Processes a request, abandoning the chain if `cancellation` fires.
    pub async fn handle_with_cancellation(
        &self,
        request: Request,
        cancellation: CancellationToken,
    ) -> Response {
        self.dispatch(request, RequestContext::new(), cancellation)
            .await
            .response
    }

    /// Runs the chain with a caller-supplied context and reports the
    /// terminal state.
    pub async fn dispatch(
        &self,
        request: Request,
        mut ctx: RequestContext,
        cancellation: CancellationToken,
    ) -> Dispatch {
        let state = ChainState::new(cancellation.clone());
        let mut writer = ResponseWriter::new();
        let span = tracing::debug_span!(
            "dispatch",
            request_id = %ctx.request_id(),
            method = %request.method(),
            path = %request.uri().path(),
        );

        let result: StageResult = {
            let mut entry = Next::new(&self.stages, &state, ENTRY);
            let chain = AssertUnwindSafe(entry.run(&request, &mut writer, &mut ctx))
                .catch_unwind()
                .instrument(span);

            tokio::select! {
                biased;
                () = cancellation.cancelled() => Err(PipelineError::Cancelled),
                outcome = chain => outcome
                    .unwrap_or_else(|payload| Err(PipelineError::panicked(payload.as_ref()))),
            }
        };

        let (response, error) = self.resolve(result, &state, writer, &mut ctx);
        tracing::debug!(
            request_id = %ctx.request_id(),
            status = response.status().as_u16(),
            failed = error.is_some(),
            "request dispatched"
        );

        Dispatch {
            response,
            error,
            context: ctx,
        }
    }

    fn resolve(
        &self,
        result: StageResult,
        state: &ChainState,
        mut writer: ResponseWriter,
        ctx: &mut RequestContext,
    ) -> (Response, Option<PipelineError>) {
        let mut swallowed = state.take_fault();
        let mut recovered = false;
        let error = match (state.take_misuse(), result) {
            (Some(misuse), Err(other)) => {
                // A stage swallowed the misuse and failed differently later
                if other.as_misuse() != Some(&misuse) {
                    if matches!(other, PipelineError::Fault { .. }) {
                        swallowed = None;
                    }
                    self.observer.report(&other, ctx);
                }
                Some(PipelineError::Misuse(misuse))
            }
            (Some(misuse), Ok(())) => Some(misuse.into()),
            (None, Err(error)) => Some(error),
            (None, Ok(())) => {
                recovered = swallowed.is_some();
                swallowed.take()
            }
        };

        // A caught fault is reported even when something else decided the outcome
        if let Some(fault) = swallowed {
            if !matches!(error, Some(PipelineError::Fault { .. })) {
                self.observer.report(&fault, ctx);
            }
        }

        let request_id = ctx.request_id().to_string();

        let (response, error) = match error {
            Some(error) => {
                let written = match error {
                    PipelineError::Fault { .. } | PipelineError::Panicked { .. } => writer.take(),
                    PipelineError::Misuse(_) | PipelineError::Cancelled => None,
                };
                // A stage that recovered from a fault may have staged its fallback
                let written = written.or_else(|| {
                    if recovered {
                        ctx.take_staged_response()
                    } else {
                        None
                    }
                });
                let response = written.unwrap_or_else(|| error_response(&error, &request_id));
                (response, Some(error))
            }
            None => {
                if let Some(response) = writer.take() {
                    (response, None)
                } else if let Some(response) = ctx.take_staged_response() {
                    (response, None)
                } else {
                    let misuse = if state.terminal_reached() {
                        Misuse::ChainExhausted
                    } else {
                        Misuse::NoResponse
                    };
                    let error = PipelineError::from(misuse);
                    (error_response(&error, &request_id), Some(error))
                }
            }
        };

        if let Some(error) = &error {
            self.observer.report(error, ctx);
        }

        (response, error)
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

fn error_response(error: &PipelineError, request_id: &str) -> Response {
    Response::envelope(error.status_code(), &error.to_envelope(Some(request_id)))
}

/// Builder for constructing a [`Pipeline`].
///
/// Stages run in the order they are added.
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
    observer: Option<Arc<dyn FaultObserver>>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            observer: None,
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends a stage that is shared with other pipelines.
    #[must_use]
    pub fn shared_stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Sets the observer that receives contained errors.
    ///
    /// Defaults to [`TracingObserver`].
    #[must_use]
    pub fn observer<O: FaultObserver>(mut self, observer: O) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            observer: self
                .observer
                .unwrap_or_else(|| Arc::new(TracingObserver)),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
