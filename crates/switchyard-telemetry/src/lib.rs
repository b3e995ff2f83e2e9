//! Observability for Switchyard pipelines.
//!
//! - **Logging**: `tracing-subscriber` setup driven by `LOG_LEVEL` and `LOG_FORMAT`
//! - **Metrics**: request counters and latency histograms via the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use switchyard_config::Configuration;
//! use switchyard_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig::from_config(Configuration::global()))?;
//!     switchyard_telemetry::metrics::describe_metrics();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use crate::metrics::{record_request, InFlightGuard};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
