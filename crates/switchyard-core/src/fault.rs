//! Pipeline failure taxonomy.
//!
//! Three things can go wrong while a request travels through a pipeline
//! beyond an ordinary domain error:
//!
//! - a stage breaks the middleware contract ([`Misuse`]),
//! - a stage fails with an error it did not model as an outcome
//!   ([`PipelineError::Fault`]) or panics ([`PipelineError::Panicked`]),
//! - the request is cancelled before the chain completes.
//!
//! All of them are contained at the outermost pipeline frame and rendered
//! as a single error response.

use crate::error::ErrorEnvelope;
use http::StatusCode;
use thiserror::Error;

/// Result type returned by every pipeline stage.
pub type StageResult = Result<(), PipelineError>;

/// A violation of the middleware contract. Always a programming error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Misuse {
    /// A stage invoked its continuation more than once.
    #[error("stage '{stage}' called next more than once")]
    NextCalledTwice {
        /// Name of the offending stage.
        stage: &'static str,
    },

    /// The end of the chain was reached and nothing wrote a response.
    #[error("middleware chain exhausted without a response being written")]
    ChainExhausted,

    /// A stage stopped the chain without writing a response.
    #[error("a stage short-circuited the chain without writing a response")]
    NoResponse,

    /// A second response was written for the same request.
    #[error("a response was already written for this request")]
    ResponseAlreadyWritten,
}

/// Errors produced while executing a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The middleware contract was violated.
    #[error("pipeline misuse: {0}")]
    Misuse(#[from] Misuse),

    /// A stage failed with an error that was not modeled as an outcome.
    #[error("unhandled fault in stage '{}': {source}", .stage.unwrap_or("<unknown>"))]
    Fault {
        /// The stage that raised the fault, once known.
        stage: Option<&'static str>,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// A stage panicked.
    #[error("stage panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The request was cancelled before the chain completed.
    #[error("request cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Wraps any error as an unhandled fault.
    pub fn fault(source: impl Into<anyhow::Error>) -> Self {
        Self::Fault {
            stage: None,
            source: source.into(),
        }
    }

    /// Builds a panic error from a `catch_unwind` payload.
    #[must_use]
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { message }
    }

    /// Attributes an unattributed fault to `stage`.
    ///
    /// Faults that already name a stage keep it, so the innermost stage wins
    /// as the error unwinds through outer stages.
    #[must_use]
    pub fn attributed_to(self, stage: &'static str) -> Self {
        match self {
            Self::Fault {
                stage: None,
                source,
            } => Self::Fault {
                stage: Some(stage),
                source,
            },
            other => other,
        }
    }

    /// Returns the misuse, if this is a contract violation.
    #[must_use]
    pub const fn as_misuse(&self) -> Option<&Misuse> {
        match self {
            Self::Misuse(misuse) => Some(misuse),
            _ => None,
        }
    }

    /// Returns the stage a fault is attributed to.
    #[must_use]
    pub const fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Fault { stage, .. } => *stage,
            Self::Misuse(Misuse::NextCalledTwice { stage }) => Some(*stage),
            _ => None,
        }
    }

    /// Returns the status code used for the error response.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Misuse(_) => "PIPELINE_MISUSE",
            Self::Fault { .. } | Self::Panicked { .. } => "INTERNAL_ERROR",
            Self::Cancelled => "REQUEST_CANCELLED",
        }
    }

    /// Builds the client-facing envelope.
    ///
    /// Fault and panic details stay server-side; clients only see a
    /// generic message.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let message = match self {
            Self::Misuse(_) | Self::Fault { .. } | Self::Panicked { .. } => {
                "An internal error occurred".to_string()
            }
            Self::Cancelled => "The request was cancelled".to_string(),
        };
        let envelope = ErrorEnvelope::new(self.code(), message);
        match request_id {
            Some(id) => envelope.with_request_id(id),
            None => envelope,
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(source: anyhow::Error) -> Self {
        Self::fault(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misuse_display() {
        let err = PipelineError::from(Misuse::NextCalledTwice { stage: "auth" });
        assert!(err.to_string().contains("auth"));
        assert_eq!(err.code(), "PIPELINE_MISUSE");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.stage(), Some("auth"));
    }

    #[test]
    fn test_fault_attribution_keeps_innermost_stage() {
        let err = PipelineError::fault(anyhow::anyhow!("disk full"))
            .attributed_to("handler")
            .attributed_to("logging");
        assert_eq!(err.stage(), Some("handler"));
        assert!(err.to_string().contains("handler"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_unattributed_fault_display() {
        let err: PipelineError = anyhow::anyhow!("oops").into();
        assert!(err.to_string().contains("<unknown>"));
    }

    #[test]
    fn test_panicked_extracts_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("kaboom");
        let err = PipelineError::panicked(payload.as_ref());
        assert!(matches!(err, PipelineError::Panicked { ref message } if message == "kaboom"));

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let err = PipelineError::panicked(payload.as_ref());
        assert!(err.to_string().contains("owned"));

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        let err = PipelineError::panicked(payload.as_ref());
        assert!(err.to_string().contains("non-string"));
    }

    #[test]
    fn test_cancelled_maps_to_503() {
        let err = PipelineError::Cancelled;
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "REQUEST_CANCELLED");
    }

    #[test]
    fn test_envelope_hides_fault_details() {
        let err = PipelineError::fault(anyhow::anyhow!("secret connection string"));
        let envelope = err.to_envelope(Some("req-9"));
        assert_eq!(envelope.error.code, "INTERNAL_ERROR");
        assert!(!envelope.error.message.contains("secret"));
        assert_eq!(envelope.request_id.as_deref(), Some("req-9"));
    }
}
