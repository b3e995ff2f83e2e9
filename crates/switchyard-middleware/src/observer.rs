//! Reporting of pipeline errors.
//!
//! Every error the pipeline contains (misuse, fault, panic or
//! cancellation) is handed to a [`FaultObserver`] before the error
//! response goes out.

use switchyard_core::{PipelineError, RequestContext};
use switchyard_telemetry::metrics::record_pipeline_error;

/// Receives every error the pipeline contains.
pub trait FaultObserver: Send + Sync + 'static {
    /// Called once per contained error, after the chain has unwound.
    fn report(&self, error: &PipelineError, ctx: &RequestContext);
}

/// Default observer: logs through `tracing` and counts errors by code.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FaultObserver for TracingObserver {
    fn report(&self, error: &PipelineError, ctx: &RequestContext) {
        record_pipeline_error(error.code());

        match error {
            PipelineError::Cancelled => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
                    "request cancelled"
                );
            }
            PipelineError::Misuse(misuse) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    stage = error.stage().unwrap_or("<unknown>"),
                    error = %misuse,
                    "middleware contract violated"
                );
            }
            PipelineError::Fault { source, .. } => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    stage = error.stage().unwrap_or("<unknown>"),
                    error = ?source,
                    "stage fault"
                );
            }
            PipelineError::Panicked { message } => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    panic = %message,
                    "stage panicked"
                );
            }
        }
    }
}
