//! Per-request deadline.
//!
//! Bounds the time the rest of the chain may take. When the deadline
//! passes, the downstream future is dropped (releasing whatever it held),
//! any partial response is discarded and a 504 `TIMEOUT` envelope is
//! written in its place.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::response::ResponseWriter;
use crate::types::Request;
use http::StatusCode;
use std::time::Duration;
use switchyard_config::Configuration;
use switchyard_core::{RequestContext, StageResult};

/// Configuration key holding the deadline in milliseconds.
pub const REQUEST_TIMEOUT_KEY: &str = "REQUEST_TIMEOUT_MS";

/// Deadline used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Middleware that enforces a deadline on the rest of the chain.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    /// Creates a timeout stage with a fixed deadline.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Reads the deadline from `REQUEST_TIMEOUT_MS`, falling back to
    /// [`DEFAULT_REQUEST_TIMEOUT`].
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.get_or_parsed(REQUEST_TIMEOUT_KEY, DEFAULT_REQUEST_TIMEOUT))
    }

    /// Returns the configured deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for TimeoutMiddleware {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn invoke<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut ResponseWriter,
        ctx: &'a mut RequestContext,
        mut next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let downstream = tokio::time::timeout(self.timeout, next.run(request, response, ctx)).await;
            if let Ok(result) = downstream {
                return result;
            }

            tracing::warn!(
                request_id = %ctx.request_id(),
                timeout_ms = self.timeout.as_secs_f64() * 1000.0,
                "request timed out"
            );

            response.take();
            response.write_error(
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                "The request did not complete in time",
            )
        })
    }
}
