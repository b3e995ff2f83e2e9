//! # Switchyard Middleware
//!
//! A composable, ordered middleware pipeline for HTTP request handling.
//!
//! Each request travels through the registered stages in order. Every stage
//! receives the request, a [`ResponseWriter`], the shared
//! [`RequestContext`](switchyard_core::RequestContext) and a [`Next`]
//! continuation. Calling `next` runs the rest of the chain; not calling it
//! short-circuits.
//!
//! ```text
//! Request → stage 0 → stage 1 → ... → stage N-1
//!                                         ↓
//! Response ← stage 0 ← stage 1 ← ... ←────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Onion order**: pre-phases run in registration order, post-phases in
//!   reverse.
//! - **One response**: every request ends in exactly one response, even
//!   when a stage faults, panics, misuses `next` or the request is
//!   cancelled.
//! - **Shared safely**: a built [`Pipeline`] is immutable and can serve
//!   concurrent requests.
//!
//! ## Example
//!
//! ```
//! use switchyard_core::Outcome;
//! use switchyard_middleware::{handler, stages::RequestIdMiddleware, Pipeline};
//!
//! let pipeline = Pipeline::builder()
//!     .stage(RequestIdMiddleware::new())
//!     .stage(handler("ping", |_request, _ctx| {
//!         Box::pin(async move {
//!             let outcome: Outcome<&str> = Outcome::success("pong");
//!             outcome
//!         })
//!     }))
//!     .build();
//!
//! assert_eq!(pipeline.stage_names(), vec!["request_id", "ping"]);
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod observer;
pub mod outcome;
pub mod pipeline;
pub mod response;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use middleware::{
    handler, BoxFuture, BoxedMiddleware, FnMiddleware, HandlerMiddleware, Middleware, Next,
};
pub use observer::{FaultObserver, TracingObserver};
pub use outcome::{render_outcome, ContextExt, RenderError};
pub use pipeline::{Dispatch, Pipeline, PipelineBuilder};
pub use response::ResponseWriter;
pub use types::{Request, Response, ResponseExt};
