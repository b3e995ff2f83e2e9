//! Typed unit-of-work outcomes.
//!
//! An [`Outcome`] is either a payload or an error, always paired with the
//! HTTP status that should go on the wire. Keeping the status separate from
//! the business result lets a stage return a domain error while still
//! choosing the response code (a missing record rendered as 404, say).

use crate::error::ApiError;
use http::StatusCode;
use thiserror::Error;

/// Error raised when an [`Outcome`] is read as the wrong variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutcomeError {
    /// The requested side of the outcome is not present.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State<T, E> {
    Success(T),
    Failure(E),
}

/// The result of a completed unit of work.
///
/// Exactly one of payload or error is present; which one is fixed at
/// construction and the value is immutable afterwards.
///
/// # Example
///
/// ```
/// use switchyard_core::Outcome;
/// use http::StatusCode;
///
/// let ok: Outcome<&str> = Outcome::success("hello alice");
/// assert!(!ok.is_error());
/// assert_eq!(ok.status_code(), StatusCode::OK);
/// assert!(ok.error().is_err());
///
/// let failed: Outcome<&str> = Outcome::failure_with_status(
///     anyhow::anyhow!("no such user"),
///     StatusCode::NOT_FOUND,
/// );
/// assert!(failed.is_error());
/// assert!(failed.payload().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T, E = anyhow::Error> {
    state: State<T, E>,
    status: StatusCode,
}

impl<T, E> Outcome<T, E> {
    /// Creates a successful outcome with status 200.
    pub fn success(payload: T) -> Self {
        Self::success_with_status(payload, StatusCode::OK)
    }

    /// Creates a successful outcome with an explicit status.
    pub fn success_with_status(payload: T, status: StatusCode) -> Self {
        Self {
            state: State::Success(payload),
            status,
        }
    }

    /// Creates a failed outcome with status 500.
    pub fn failure(error: E) -> Self {
        Self::failure_with_status(error, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Creates a failed outcome with an explicit status.
    pub fn failure_with_status(error: E, status: StatusCode) -> Self {
        Self {
            state: State::Failure(error),
            status,
        }
    }

    /// Returns `true` if this outcome carries an error.
    pub const fn is_error(&self) -> bool {
        matches!(self.state, State::Failure(_))
    }

    /// Returns the status code to put on the wire.
    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Returns the payload of a successful outcome.
    pub fn payload(&self) -> Result<&T, OutcomeError> {
        match &self.state {
            State::Success(payload) => Ok(payload),
            State::Failure(_) => Err(OutcomeError::InvalidState(
                "payload requested from a failed outcome",
            )),
        }
    }

    /// Returns the error of a failed outcome.
    pub fn error(&self) -> Result<&E, OutcomeError> {
        match &self.state {
            State::Failure(error) => Ok(error),
            State::Success(_) => Err(OutcomeError::InvalidState(
                "error requested from a successful outcome",
            )),
        }
    }

    /// Consumes the outcome, returning its payload.
    pub fn into_payload(self) -> Result<T, OutcomeError> {
        match self.state {
            State::Success(payload) => Ok(payload),
            State::Failure(_) => Err(OutcomeError::InvalidState(
                "payload requested from a failed outcome",
            )),
        }
    }

    /// Consumes the outcome, returning its error.
    pub fn into_error(self) -> Result<E, OutcomeError> {
        match self.state {
            State::Failure(error) => Ok(error),
            State::Success(_) => Err(OutcomeError::InvalidState(
                "error requested from a successful outcome",
            )),
        }
    }

    /// Splits the outcome into a standard `Result`, dropping the status.
    pub fn into_result(self) -> Result<T, E> {
        match self.state {
            State::Success(payload) => Ok(payload),
            State::Failure(error) => Err(error),
        }
    }

    /// Splits the outcome into its status and a standard `Result`.
    pub fn into_parts(self) -> (StatusCode, Result<T, E>) {
        let status = self.status;
        (status, self.into_result())
    }

    /// Maps the payload, keeping the status.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U, E> {
        let state = match self.state {
            State::Success(payload) => State::Success(f(payload)),
            State::Failure(error) => State::Failure(error),
        };
        Outcome {
            state,
            status: self.status,
        }
    }

    /// Maps the error, keeping the status.
    pub fn map_err<F2, F: FnOnce(E) -> F2>(self, f: F) -> Outcome<T, F2> {
        let state = match self.state {
            State::Success(payload) => State::Success(payload),
            State::Failure(error) => State::Failure(f(error)),
        };
        Outcome {
            state,
            status: self.status,
        }
    }
}

impl<T> From<ApiError> for Outcome<T, ApiError> {
    /// Wraps a domain error using its category's default status.
    fn from(error: ApiError) -> Self {
        let status = error.status_code();
        Self::failure_with_status(error, status)
    }
}

impl<T> From<Result<T, ApiError>> for Outcome<T, ApiError> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(error) => error.into(),
        }
    }
}
