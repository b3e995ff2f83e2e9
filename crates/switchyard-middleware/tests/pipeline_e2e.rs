//! End-to-end pipeline integration tests.
//!
//! These tests run the built-in stages together with application stages:
//!
//! 1. Request ID - assign and echo the request id
//! 2. Telemetry - metrics and completion log
//! 3. Timeout - per-request deadline
//! 4. Application stages and a terminal handler

use bytes::Bytes;
use http::{Request as HttpRequest, StatusCode};
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use switchyard_core::{ApiError, Outcome, PipelineError, RequestContext};
use switchyard_middleware::{
    handler,
    stages::{
        request_id::REQUEST_ID_HEADER,
        telemetry::TELEMETRY_RECORD_KEY,
        RequestIdMiddleware, TelemetryMiddleware, TelemetryRecord, TimeoutMiddleware,
    },
    FaultObserver, FnMiddleware, Pipeline, Request, Response,
};
use tokio_util::sync::CancellationToken;

/// Creates a test request with an optional bearer token.
fn make_request(path: &str, token: Option<&str>) -> Request {
    let mut builder = HttpRequest::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[derive(Default, Clone)]
struct CollectingObserver(Arc<Mutex<Vec<String>>>);

impl FaultObserver for CollectingObserver {
    fn report(&self, error: &PipelineError, ctx: &RequestContext) {
        self.0
            .lock()
            .push(format!("{}:{}", error.code(), ctx.request_id()));
    }
}

/// Builds the full stack used by most tests.
fn full_pipeline(observer: CollectingObserver) -> Pipeline {
    Pipeline::builder()
        .observer(observer)
        .stage(RequestIdMiddleware::new())
        .stage(TelemetryMiddleware::new("orders"))
        .stage(TimeoutMiddleware::new(Duration::from_secs(5)))
        .stage(FnMiddleware::new("auth", |request, response, ctx, mut next| {
            Box::pin(async move {
                let token = request
                    .headers()
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "));

                match token {
                    Some(user) => {
                        ctx.set("user", user.to_string());
                        next.run(request, response, ctx).await
                    }
                    None => response.write_outcome(
                        Outcome::<(), ApiError>::from(ApiError::authentication(
                            "missing bearer token",
                        )),
                        Some(&ctx.request_id().to_string()),
                    ),
                }
            })
        }))
        .stage(handler("get_order", |request, ctx| {
            Box::pin(async move {
                let user = ctx.get_typed::<String>("user").cloned().unwrap_or_default();
                let outcome: Outcome<serde_json::Value, ApiError> = match request.uri().path() {
                    "/orders/7" => Outcome::success(serde_json::json!({
                        "order": 7,
                        "owner": user,
                    })),
                    _ => ApiError::not_found("no such order").into(),
                };
                outcome
            })
        }))
        .build()
}

#[tokio::test]
async fn test_full_stack_success() {
    let observer = CollectingObserver::default();
    let pipeline = full_pipeline(observer.clone());

    let dispatch = pipeline
        .dispatch(
            make_request("/orders/7", Some("alice")),
            RequestContext::new(),
            CancellationToken::new(),
        )
        .await;

    assert!(dispatch.error.is_none());
    assert_eq!(dispatch.response.status(), StatusCode::OK);
    assert_eq!(
        dispatch.response.headers()[REQUEST_ID_HEADER]
            .to_str()
            .unwrap(),
        dispatch.context.request_id().to_string()
    );

    let record = dispatch
        .context
        .get_typed::<TelemetryRecord>(TELEMETRY_RECORD_KEY)
        .cloned()
        .unwrap();
    assert_eq!(record.status_code, 200);
    assert_eq!(record.path, "/orders/7");

    let body = body_json(dispatch.response).await;
    assert_eq!(body["owner"], "alice");
    assert!(observer.0.lock().is_empty());
}

#[tokio::test]
async fn test_full_stack_unauthenticated() {
    let pipeline = full_pipeline(CollectingObserver::default());

    let dispatch = pipeline
        .dispatch(
            make_request("/orders/7", None),
            RequestContext::new(),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(dispatch.response.status(), StatusCode::UNAUTHORIZED);
    assert!(!dispatch.context.contains("user"));
    assert!(dispatch.response.headers().contains_key(REQUEST_ID_HEADER));

    let request_id = dispatch.context.request_id().to_string();
    let body = body_json(dispatch.response).await;
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");
    assert_eq!(body["request_id"], request_id.as_str());
}

#[tokio::test]
async fn test_full_stack_domain_error() {
    let pipeline = full_pipeline(CollectingObserver::default());

    let response = pipeline
        .handle(make_request("/orders/8", Some("alice")))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_observer_sees_request_id_of_failed_request() {
    let observer = CollectingObserver::default();
    let pipeline = Pipeline::builder()
        .observer(observer.clone())
        .stage(RequestIdMiddleware::new())
        .stage(FnMiddleware::new("greedy", |request, response, ctx, mut next| {
            Box::pin(async move {
                next.run(request, response, ctx).await?;
                next.run(request, response, ctx).await
            })
        }))
        .stage(handler("ok", |_request, _ctx| {
            Box::pin(async move {
                let outcome: Outcome<&str> = Outcome::success("ok");
                outcome
            })
        }))
        .build();

    let dispatch = pipeline
        .dispatch(
            make_request("/", None),
            RequestContext::new(),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(dispatch.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        *observer.0.lock(),
        vec![format!("PIPELINE_MISUSE:{}", dispatch.context.request_id())]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_have_independent_contexts() {
    let pipeline = Arc::new(full_pipeline(CollectingObserver::default()));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let user = format!("user-{i}");
                let response = pipeline
                    .handle(make_request("/orders/7", Some(&user)))
                    .await;
                (user, response)
            })
        })
        .collect();

    let mut request_ids = std::collections::HashSet::new();
    for task in tasks {
        let (user, response) = task.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        request_ids.insert(
            response.headers()[REQUEST_ID_HEADER]
                .to_str()
                .unwrap()
                .to_string(),
        );
        assert_eq!(body_json(response).await["owner"], user.as_str());
    }
    assert_eq!(request_ids.len(), 32);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_inside_full_stack() {
    let pipeline = Pipeline::builder()
        .stage(RequestIdMiddleware::new())
        .stage(TelemetryMiddleware::new("orders"))
        .stage(TimeoutMiddleware::new(Duration::from_millis(100)))
        .stage(handler("slow", |_request, _ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                let outcome: Outcome<&str> = Outcome::success("late");
                outcome
            })
        }))
        .build();

    let dispatch = pipeline
        .dispatch(
            make_request("/slow", None),
            RequestContext::new(),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(dispatch.response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(dispatch.response.headers().contains_key(REQUEST_ID_HEADER));
    assert_eq!(
        dispatch
            .context
            .get_typed::<TelemetryRecord>(TELEMETRY_RECORD_KEY)
            .map(|record| record.status_code),
        Some(504)
    );
}

#[tokio::test]
async fn test_host_cancellation_inside_full_stack() {
    let pipeline = full_pipeline(CollectingObserver::default());
    let token = CancellationToken::new();
    token.cancel();

    let response = pipeline
        .handle_with_cancellation(make_request("/orders/7", Some("alice")), token)
        .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"]["code"], "REQUEST_CANCELLED");
}
