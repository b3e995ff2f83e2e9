//! Rendering [`Outcome`]s into HTTP responses.
//!
//! A stage that finishes a unit of work can either write the rendered
//! outcome straight into the [`ResponseWriter`](crate::ResponseWriter) or
//! stage it in the request context with [`ContextExt::stage_outcome`]. A
//! staged outcome is sent by the pipeline only if no stage wrote a
//! response directly.

use crate::types::{Response, ResponseExt};
use http::StatusCode;
use serde::Serialize;
use switchyard_core::{ApiError, ErrorEnvelope, Outcome, PipelineError, RequestContext, StageResult};

const STAGED_RESPONSE_KEY: &str = "switchyard.staged_response";

const GENERIC_MESSAGE: &str = "An internal error occurred";

/// Turns the error side of an outcome into a client-facing envelope.
///
/// Implementations must not leak internal details for 5xx statuses.
pub trait RenderError {
    /// Builds the envelope for this error rendered with `status`.
    fn render(&self, status: StatusCode, request_id: Option<&str>) -> ErrorEnvelope;
}

impl RenderError for ApiError {
    fn render(&self, _status: StatusCode, request_id: Option<&str>) -> ErrorEnvelope {
        self.to_envelope(request_id)
    }
}

impl RenderError for anyhow::Error {
    fn render(&self, status: StatusCode, request_id: Option<&str>) -> ErrorEnvelope {
        display_envelope(self, status, request_id)
    }
}

impl RenderError for String {
    fn render(&self, status: StatusCode, request_id: Option<&str>) -> ErrorEnvelope {
        display_envelope(self, status, request_id)
    }
}

impl RenderError for &'static str {
    fn render(&self, status: StatusCode, request_id: Option<&str>) -> ErrorEnvelope {
        display_envelope(self, status, request_id)
    }
}

fn display_envelope(
    error: &dyn std::fmt::Display,
    status: StatusCode,
    request_id: Option<&str>,
) -> ErrorEnvelope {
    let message = if status.is_server_error() {
        GENERIC_MESSAGE.to_string()
    } else {
        error.to_string()
    };
    let envelope = ErrorEnvelope::new(status_code_name(status), message);
    match request_id {
        Some(id) => envelope.with_request_id(id),
        None => envelope,
    }
}

/// `404 Not Found` becomes `NOT_FOUND`.
fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(|reason| reason.to_ascii_uppercase().replace([' ', '-', '\''], "_"))
        .unwrap_or_else(|| format!("HTTP_{}", status.as_u16()))
}

/// Renders an outcome: the payload as JSON, or the error as an envelope.
///
/// # Errors
///
/// Returns a fault if the payload cannot be serialized.
pub fn render_outcome<T, E>(
    outcome: Outcome<T, E>,
    request_id: Option<&str>,
) -> Result<Response, PipelineError>
where
    T: Serialize,
    E: RenderError,
{
    let (status, result) = outcome.into_parts();
    match result {
        Ok(payload) => Response::json(status, &payload).map_err(PipelineError::fault),
        Err(error) => Ok(Response::envelope(status, &error.render(status, request_id))),
    }
}

struct StagedResponse(Response);

/// Outcome staging on [`RequestContext`].
pub trait ContextExt {
    /// Renders `outcome` and stores it for the pipeline to send.
    ///
    /// Staging again replaces the earlier outcome.
    fn stage_outcome<T, E>(&mut self, outcome: Outcome<T, E>) -> StageResult
    where
        T: Serialize,
        E: RenderError;

    /// Returns `true` if an outcome has been staged.
    fn has_staged_outcome(&self) -> bool;

    /// Returns the staged response for adjustment (headers, say).
    fn staged_response_mut(&mut self) -> Option<&mut Response>;

    /// Removes and returns the staged response.
    fn take_staged_response(&mut self) -> Option<Response>;
}

impl ContextExt for RequestContext {
    fn stage_outcome<T, E>(&mut self, outcome: Outcome<T, E>) -> StageResult
    where
        T: Serialize,
        E: RenderError,
    {
        let request_id = self.request_id().to_string();
        let response = render_outcome(outcome, Some(&request_id))?;
        tracing::debug!(
            request_id = %request_id,
            status = response.status().as_u16(),
            "outcome staged"
        );
        self.set(STAGED_RESPONSE_KEY, StagedResponse(response));
        Ok(())
    }

    fn has_staged_outcome(&self) -> bool {
        self.get_typed::<StagedResponse>(STAGED_RESPONSE_KEY).is_some()
    }

    fn staged_response_mut(&mut self) -> Option<&mut Response> {
        self.get_typed_mut::<StagedResponse>(STAGED_RESPONSE_KEY)
            .map(|staged| &mut staged.0)
    }

    fn take_staged_response(&mut self) -> Option<Response> {
        self.take_typed::<StagedResponse>(STAGED_RESPONSE_KEY)
            .map(|staged| staged.0)
    }
}
