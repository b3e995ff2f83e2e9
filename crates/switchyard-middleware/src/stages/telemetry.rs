//! Telemetry emission middleware.
//!
//! Times the rest of the chain and emits a request counter, a latency
//! histogram and one structured completion log line per request.
//!
//! # Metrics Emitted
//!
//! - `switchyard_requests_total` - counter by method and status
//! - `switchyard_request_duration_seconds` - latency histogram
//! - `switchyard_in_flight_requests` - gauge of requests being processed
//!
//! The status recorded is the one the client will see: the written
//! response, else the staged outcome, else the error's status.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::outcome::ContextExt;
use crate::response::ResponseWriter;
use crate::types::Request;
use http::StatusCode;
use std::time::Instant;
use switchyard_core::{RequestContext, StageResult};
use switchyard_telemetry::metrics::{record_request, InFlightGuard};

/// Context key under which the [`TelemetryRecord`] is stored.
pub const TELEMETRY_RECORD_KEY: &str = "switchyard.telemetry";

/// Middleware that emits metrics and a completion log for every request.
#[derive(Debug, Clone)]
pub struct TelemetryMiddleware {
    service_name: String,
}

/// What the telemetry stage observed about one request.
///
/// Left in the request context for later stages and hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// The service name label.
    pub service_name: String,
    /// The HTTP method.
    pub method: String,
    /// The request path.
    pub path: String,
    /// The HTTP status code sent to the client.
    pub status_code: u16,
    /// Time spent in the rest of the chain, in milliseconds.
    pub duration_ms: f64,
}

impl TelemetryMiddleware {
    /// Creates a telemetry middleware labelled with `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Returns the service name label.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

fn observed_status(
    result: &StageResult,
    response: &ResponseWriter,
    ctx: &mut RequestContext,
) -> StatusCode {
    if let Err(error) = result {
        if error.as_misuse().is_some() || !response.is_written() {
            return error.status_code();
        }
    }
    response
        .status()
        .or_else(|| ctx.staged_response_mut().map(|staged| staged.status()))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl Middleware for TelemetryMiddleware {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn invoke<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut ResponseWriter,
        ctx: &'a mut RequestContext,
        mut next: Next<'a>,
    ) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            let _in_flight = InFlightGuard::new();
            let start = Instant::now();

            let result = next.run(request, response, ctx).await;

            let duration = start.elapsed();
            let status = observed_status(&result, response, ctx);
            let method = request.method().as_str();

            record_request(method, status.as_u16(), duration);

            let record = TelemetryRecord {
                service_name: self.service_name.clone(),
                method: method.to_string(),
                path: request.uri().path().to_string(),
                status_code: status.as_u16(),
                duration_ms: duration.as_secs_f64() * 1000.0,
            };

            tracing::info!(
                service = %record.service_name,
                request_id = %ctx.request_id(),
                http.method = %record.method,
                http.path = %record.path,
                http.status_code = record.status_code,
                duration_ms = record.duration_ms,
                "request completed"
            );

            ctx.set(TELEMETRY_RECORD_KEY, record);
            result
        })
    }
}
