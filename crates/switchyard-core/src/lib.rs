//! # Switchyard Core
//!
//! Core types for the Switchyard request pipeline.
//!
//! This crate has no knowledge of middleware execution; it provides the
//! values that flow through it:
//!
//! - [`Outcome`] - Success/error result paired with an HTTP status
//! - [`RequestContext`] - Per-request key/value bag shared by stages
//! - [`RequestId`] - UUID v7 request identifier
//! - [`ApiError`] - Domain errors with category → status mapping
//! - [`PipelineError`] / [`Misuse`] - Contract violations, faults, cancellation

#![doc(html_root_url = "https://docs.rs/switchyard-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod fault;
mod outcome;

pub use context::{ContextValue, RequestContext, RequestId};
pub use error::{ApiError, ErrorCategory, ErrorDetail, ErrorEnvelope};
pub use fault::{Misuse, PipelineError, StageResult};
pub use outcome::{Outcome, OutcomeError};
