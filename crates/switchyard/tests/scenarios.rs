//! Request scenarios run through the public facade.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use switchyard::prelude::*;

type Journal = Arc<Mutex<Vec<String>>>;

fn request(user: Option<&str>) -> Request {
    let mut builder = http::Request::builder().uri("/greet");
    if let Some(user) = user {
        builder = builder.header("x-user", user);
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Auth → Logging → Handler, each writing to a shared journal.
fn greeting_pipeline(journal: &Journal) -> Pipeline {
    let auth_journal = journal.clone();
    let logging_journal = journal.clone();
    let handler_journal = journal.clone();

    Pipeline::builder()
        .stage(FnMiddleware::new("auth", move |request, response, ctx, mut next| {
            let journal = auth_journal.clone();
            Box::pin(async move {
                journal.lock().push("auth".to_string());
                let user = request
                    .headers()
                    .get("x-user")
                    .and_then(|value| value.to_str().ok());
                match user {
                    Some(user) => {
                        ctx.set("user", user.to_string());
                        next.run(request, response, ctx).await
                    }
                    None => response.write_status(StatusCode::UNAUTHORIZED),
                }
            })
        }))
        .stage(FnMiddleware::new("logging", move |request, response, ctx, mut next| {
            let journal = logging_journal.clone();
            Box::pin(async move {
                let start = Instant::now();
                journal.lock().push("logging:before".to_string());
                ctx.set("logging.started", true);
                next.run(request, response, ctx).await?;
                ctx.set("logging.duration", start.elapsed());
                journal.lock().push("logging:after".to_string());
                Ok(())
            })
        }))
        .stage(handler("greet", move |_request, ctx| {
            let journal = handler_journal.clone();
            Box::pin(async move {
                journal.lock().push("handler".to_string());
                let outcome: Outcome<String> = match ctx.get_typed::<String>("user") {
                    Some(user) => Outcome::success(format!("hello {user}")),
                    None => Outcome::failure_with_status(
                        anyhow::anyhow!("no user"),
                        StatusCode::UNAUTHORIZED,
                    ),
                };
                outcome
            })
        }))
        .build()
}

#[tokio::test]
async fn test_authenticated_greeting() {
    let journal = Journal::default();
    let pipeline = greeting_pipeline(&journal);

    let dispatch = pipeline
        .dispatch(
            request(Some("alice")),
            RequestContext::new(),
            Default::default(),
        )
        .await;

    assert_eq!(dispatch.response.status(), StatusCode::OK);
    assert!(dispatch.context.get_typed::<Duration>("logging.duration").is_some());
    assert_eq!(
        *journal.lock(),
        vec!["auth", "logging:before", "handler", "logging:after"]
    );
    assert_eq!(body_json(dispatch.response).await, "hello alice");
}

#[tokio::test]
async fn test_missing_credentials_short_circuit() {
    let journal = Journal::default();
    let pipeline = greeting_pipeline(&journal);

    let dispatch = pipeline
        .dispatch(request(None), RequestContext::new(), Default::default())
        .await;

    assert_eq!(dispatch.response.status(), StatusCode::UNAUTHORIZED);
    assert!(dispatch.error.is_none());
    assert_eq!(*journal.lock(), vec!["auth"]);
    assert!(!dispatch.context.contains("user"));
    assert!(!dispatch.context.contains("logging.started"));
    assert!(!dispatch.context.contains("logging.duration"));
}

#[tokio::test]
async fn test_chain_without_terminal_handler() {
    let pipeline = Pipeline::builder()
        .stage(FnMiddleware::new("pass", |request, response, ctx, mut next| {
            Box::pin(async move { next.run(request, response, ctx).await })
        }))
        .build();

    let dispatch = pipeline
        .dispatch(request(None), RequestContext::new(), Default::default())
        .await;

    assert_eq!(dispatch.response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(matches!(
        dispatch.error,
        Some(PipelineError::Misuse(Misuse::ChainExhausted))
    ));
    assert_eq!(
        body_json(dispatch.response).await["error"]["code"],
        "PIPELINE_MISUSE"
    );
}

#[tokio::test]
async fn test_double_next_yields_single_misuse_response() {
    let handled = Arc::new(Mutex::new(0_u32));
    let counter = handled.clone();

    let pipeline = Pipeline::builder()
        .stage(FnMiddleware::new("twice", |request, response, ctx, mut next| {
            Box::pin(async move {
                let _ = next.run(request, response, ctx).await;
                let _ = next.run(request, response, ctx).await;
                Ok(())
            })
        }))
        .stage(handler("count", move |_request, _ctx| {
            let counter = counter.clone();
            Box::pin(async move {
                *counter.lock() += 1;
                let outcome: Outcome<&str> = Outcome::success("counted");
                outcome
            })
        }))
        .build();

    let response = pipeline.handle(request(None)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(*handled.lock(), 1);
}

#[tokio::test]
async fn test_configured_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("appsettings.cfg"),
        "# service settings\nREQUEST_TIMEOUT_MS = 5000\nSERVICE_NAME = greeter\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("appsettings.test.cfg"),
        "REQUEST_TIMEOUT_MS = 20\n",
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_base_dir(dir.path())
        .with_deployment_mode("test")
        .without_env()
        .load()
        .unwrap();

    let timeout = TimeoutMiddleware::from_config(&config);
    assert_eq!(timeout.timeout(), Duration::from_millis(20));

    let pipeline = Pipeline::builder()
        .stage(RequestIdMiddleware::new())
        .stage(TelemetryMiddleware::new(config.get_or("SERVICE_NAME", "unknown")))
        .stage(timeout)
        .stage(handler("slow", |_request, _ctx| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let outcome: Outcome<&str> = Outcome::success("late");
                outcome
            })
        }))
        .build();

    let response = pipeline.handle(request(None)).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[test]
fn test_log_config_from_configuration() {
    let config = ConfigLoader::new()
        .without_files()
        .without_env()
        .with_values([("LOG_LEVEL", "debug"), ("LOG_FORMAT", "PRETTY")])
        .load()
        .unwrap();

    let log_config = LogConfig::from_config(&config);
    assert_eq!(log_config.level, "debug");
    assert_eq!(log_config.format, LogFormat::Pretty);
}
