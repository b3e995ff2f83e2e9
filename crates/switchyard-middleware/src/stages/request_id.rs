//! Request ID middleware.
//!
//! Assigns every request a [`RequestId`] and echoes it back on the
//! response, so clients can correlate their calls with server logs.
//!
//! ## Request ID Sources
//!
//! 1. **X-Request-ID header**: used when the stage trusts incoming ids and
//!    the header holds a valid UUID
//! 2. **Generated UUID v7**: otherwise
//!
//! The id is echoed on the written response, or on the staged outcome when
//! no stage wrote one directly.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::outcome::ContextExt;
use crate::response::ResponseWriter;
use crate::types::{Request, Response};
use http::HeaderValue;
use switchyard_core::{RequestContext, RequestId, StageResult};
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that generates or extracts request IDs.
///
/// # Example
///
/// ```
/// use switchyard_middleware::stages::RequestIdMiddleware;
/// use switchyard_middleware::Pipeline;
///
/// let pipeline = Pipeline::builder()
///     .stage(RequestIdMiddleware::trust_incoming())
///     .build();
/// assert_eq!(pipeline.stage_names(), vec!["request_id"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    /// Whether to trust incoming request ID headers.
    ///
    /// Typically `false` for external traffic and `true` for internal
    /// service-to-service calls.
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates a middleware that always generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that reuses valid incoming `X-Request-ID` headers.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId::from_uuid)
    }
}

fn stamp(response: &mut Response, value: &HeaderValue) {
    response
        .headers_mut()
        .insert(REQUEST_ID_HEADER, value.clone());
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn invoke<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut ResponseWriter,
        ctx: &'a mut RequestContext,
        mut next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let request_id = self
                .extract_request_id(request)
                .unwrap_or_else(RequestId::new);
            ctx.set_request_id(request_id);

            let result = next.run(request, response, ctx).await;

            // A UUID always renders as a valid header value
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                if let Some(written) = response.response_mut() {
                    stamp(written, &value);
                } else if let Some(staged) = ctx.staged_response_mut() {
                    stamp(staged, &value);
                }
            }

            result
        })
    }
}
