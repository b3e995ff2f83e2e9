//! # Switchyard
//!
//! **Composable middleware pipelines for async HTTP services**
//!
//! Switchyard routes every request through an ordered list of stages:
//!
//! - 🧅 **Onion ordering** – pre-phases in registration order, post-phases in reverse
//! - ✂️ **Short-circuiting** – a stage that does not call `next` ends the chain
//! - 🛡️ **Fault containment** – faults, panics and contract violations become one 500
//! - 📦 **Typed outcomes** – handlers return [`Outcome`](core::Outcome) values rendered as JSON
//! - ⚙️ **Layered configuration** – cfg files, deployment-mode overlays and env overrides
//!
//! ## Quick Start
//!
//! ```
//! use switchyard::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = Pipeline::builder()
//!     .stage(RequestIdMiddleware::new())
//!     .stage(FnMiddleware::new("auth", |request, response, ctx, mut next| {
//!         Box::pin(async move {
//!             ctx.set("user", "alice".to_string());
//!             next.run(request, response, ctx).await
//!         })
//!     }))
//!     .stage(handler("greet", |_request, ctx| {
//!         Box::pin(async move {
//!             let user = ctx.get_typed::<String>("user").cloned().unwrap_or_default();
//!             let outcome: Outcome<String> = Outcome::success(format!("hello {user}"));
//!             outcome
//!         })
//!     }))
//!     .build();
//!
//! let request = http::Request::new(http_body_util::Full::new(bytes::Bytes::new()));
//! let response = pipeline.handle(request).await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → RequestId → Telemetry → Timeout → (your stages) → handler
//!                                                                ↓
//! Response ← RequestId ← Telemetry ← Timeout ← (your stages) ←───┘
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use switchyard_core as core;

// Re-export configuration
pub use switchyard_config as config;

// Re-export middleware types
pub use switchyard_middleware as middleware;

// Re-export telemetry setup
pub use switchyard_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use switchyard::prelude::*;
///
/// let pipeline = Pipeline::builder().stage(TimeoutMiddleware::default()).build();
/// assert_eq!(pipeline.stage_count(), 1);
/// ```
pub mod prelude {
    pub use switchyard_core::{
        ApiError, Misuse, Outcome, PipelineError, RequestContext, RequestId, StageResult,
    };

    pub use switchyard_config::{ConfigLoader, Configuration, FromConfigValue};

    pub use switchyard_middleware::{
        handler, BoxFuture, ContextExt, FaultObserver, FnMiddleware, Middleware, Next, Pipeline,
        PipelineBuilder, Request, Response, ResponseExt, ResponseWriter,
    };

    // Built-in stages
    pub use switchyard_middleware::stages::{
        RequestIdMiddleware, TelemetryMiddleware, TimeoutMiddleware,
    };

    pub use switchyard_telemetry::{init_logging, LogConfig, LogFormat};
}
