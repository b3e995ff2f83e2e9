//! Common types used throughout the middleware pipeline.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use switchyard_core::ErrorEnvelope;

/// The HTTP request type used in the middleware pipeline.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

const APPLICATION_JSON: &str = "application/json";

/// Extension trait for building responses without a fallible builder.
pub trait ResponseExt {
    /// Creates an empty response with the given status.
    fn empty(status: StatusCode) -> Response;

    /// Creates a JSON error response from a code and message.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// Creates a JSON response from an error envelope.
    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response;

    /// Serializes `body` as a JSON response.
    fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T)
        -> Result<Response, serde_json::Error>;
}

impl ResponseExt for Response {
    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        Self::envelope(status, &ErrorEnvelope::new(code, message))
    }

    fn envelope(status: StatusCode, envelope: &ErrorEnvelope) -> Response {
        // An envelope is plain strings and JSON values; it always serializes
        let body = serde_json::to_vec(envelope).unwrap_or_default();
        with_body(status, APPLICATION_JSON, body)
    }

    fn json<T: Serialize + ?Sized>(
        status: StatusCode,
        body: &T,
    ) -> Result<Response, serde_json::Error> {
        let body = serde_json::to_vec(body)?;
        Ok(with_body(status, APPLICATION_JSON, body))
    }
}

fn with_body(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response {
    let mut response = http::Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_empty_response() {
        let response = Response::empty(StatusCode::NO_CONTENT);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_json_error_response() {
        let response = Response::json_error(
            StatusCode::UNAUTHORIZED,
            "AUTH_REQUIRED",
            "Authentication required",
        );
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
        assert_eq!(body["error"]["message"], "Authentication required");
        assert!(body.get("request_id").is_none());
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = Response::json(StatusCode::CREATED, &serde_json::json!({"id": 7})).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["id"], 7);
    }
}
