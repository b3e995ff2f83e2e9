//! Built-in middleware stages.
//!
//! None of these are mandatory; a pipeline uses whichever it registers, in
//! the order it registers them. A typical service puts them first:
//!
//! ```text
//! RequestId → Telemetry → Timeout → (application stages) → handler
//! ```
//!
//! - [`request_id`] - assign and echo the request id
//! - [`telemetry`] - request metrics and completion logs
//! - [`timeout`] - per-request deadline

pub mod request_id;
pub mod telemetry;
pub mod timeout;

pub use request_id::RequestIdMiddleware;
pub use telemetry::{TelemetryMiddleware, TelemetryRecord};
pub use timeout::TimeoutMiddleware;
