//! The single-response buffer handed to every stage.

use crate::outcome::{render_outcome, RenderError};
use crate::types::{Response, ResponseExt};
use http::StatusCode;
use serde::Serialize;
use switchyard_core::{Misuse, Outcome, PipelineError, StageResult};

/// Holds the response for one request.
///
/// At most one response can be written. A second write is rejected with
/// [`Misuse::ResponseAlreadyWritten`] and the first response is kept.
/// Stages that need to replace a response (a timeout discarding partial
/// work, say) must [`take`](Self::take) it first.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    response: Option<Response>,
}

impl ResponseWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a response has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.response.is_some()
    }

    /// Returns the status of the written response.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    /// Writes a complete response.
    pub fn write(&mut self, response: Response) -> StageResult {
        if self.response.is_some() {
            return Err(Misuse::ResponseAlreadyWritten.into());
        }
        self.response = Some(response);
        Ok(())
    }

    /// Writes an empty response with `status`.
    pub fn write_status(&mut self, status: StatusCode) -> StageResult {
        self.write(Response::empty(status))
    }

    /// Writes `body` as JSON.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, status: StatusCode, body: &T) -> StageResult {
        let response = Response::json(status, body).map_err(PipelineError::fault)?;
        self.write(response)
    }

    /// Writes an error envelope built from a code and message.
    pub fn write_error(&mut self, status: StatusCode, code: &str, message: &str) -> StageResult {
        self.write(Response::json_error(status, code, message))
    }

    /// Renders and writes an outcome.
    ///
    /// `request_id` is included in error envelopes.
    pub fn write_outcome<T, E>(&mut self, outcome: Outcome<T, E>, request_id: Option<&str>) -> StageResult
    where
        T: Serialize,
        E: RenderError,
    {
        if self.response.is_some() {
            return Err(Misuse::ResponseAlreadyWritten.into());
        }
        let response = render_outcome(outcome, request_id)?;
        self.write(response)
    }

    /// Returns the written response.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Returns the written response for adjustment.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Removes the written response, leaving the writer empty.
    pub fn take(&mut self) -> Option<Response> {
        self.response.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_once() {
        let mut writer = ResponseWriter::new();
        assert!(!writer.is_written());

        writer.write_status(StatusCode::UNAUTHORIZED).unwrap();
        assert!(writer.is_written());
        assert_eq!(writer.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_second_write_rejected_and_first_kept() {
        let mut writer = ResponseWriter::new();
        writer.write_status(StatusCode::CREATED).unwrap();

        let err = writer.write_status(StatusCode::OK).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Misuse(Misuse::ResponseAlreadyWritten)
        ));
        assert_eq!(writer.status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn test_second_outcome_rejected() {
        let mut writer = ResponseWriter::new();
        let first: Outcome<&str> = Outcome::success("one");
        let second: Outcome<&str> = Outcome::success("two");
        writer.write_outcome(first, None).unwrap();
        assert!(writer.write_outcome(second, None).is_err());
    }

    #[test]
    fn test_take_allows_rewrite() {
        let mut writer = ResponseWriter::new();
        writer.write_status(StatusCode::OK).unwrap();

        let taken = writer.take().unwrap();
        assert_eq!(taken.status(), StatusCode::OK);
        assert!(!writer.is_written());

        writer
            .write_error(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", "too slow")
            .unwrap();
        assert_eq!(writer.status(), Some(StatusCode::GATEWAY_TIMEOUT));
    }

    #[test]
    fn test_response_mut_edits_headers() {
        let mut writer = ResponseWriter::new();
        writer.write_json(StatusCode::OK, &[1, 2, 3]).unwrap();
        writer
            .response_mut()
            .unwrap()
            .headers_mut()
            .insert("x-extra", http::HeaderValue::from_static("1"));
        assert!(writer.response().unwrap().headers().contains_key("x-extra"));
    }
}
