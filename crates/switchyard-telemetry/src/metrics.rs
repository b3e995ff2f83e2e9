//! Request metrics for Switchyard.
//!
//! Metrics are emitted through the `metrics` facade; installing a recorder
//! (Prometheus or otherwise) is left to the host.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `switchyard_requests_total` | Counter | `method`, `status` | Total requests |
//! | `switchyard_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `switchyard_in_flight_requests` | Gauge | - | In-flight requests |
//! | `switchyard_pipeline_errors_total` | Counter | `code` | Failed dispatches |

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Request counter name.
pub const REQUESTS_TOTAL: &str = "switchyard_requests_total";

/// Request duration histogram name.
pub const REQUEST_DURATION_SECONDS: &str = "switchyard_request_duration_seconds";

/// In-flight gauge name.
pub const IN_FLIGHT_REQUESTS: &str = "switchyard_in_flight_requests";

/// Pipeline error counter name.
pub const PIPELINE_ERRORS_TOTAL: &str = "switchyard_pipeline_errors_total";

/// Registers descriptions for all standard metrics.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests dispatched");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "Request duration through the pipeline in seconds"
    );
    describe_gauge!(
        IN_FLIGHT_REQUESTS,
        "Number of requests currently inside the pipeline"
    );
    describe_counter!(
        PIPELINE_ERRORS_TOTAL,
        "Dispatches that ended in a fault, misuse or cancellation"
    );
}

/// Records a completed request.
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        REQUEST_DURATION_SECONDS,
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a dispatch that ended in an error.
pub fn record_pipeline_error(code: &'static str) {
    counter!(PIPELINE_ERRORS_TOTAL, "code" => code).increment(1);
}

/// Guard that tracks a request in the in-flight gauge until dropped.
///
/// The gauge is decremented even if the request unwinds.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
