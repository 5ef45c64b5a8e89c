//! Request correlation.
//!
//! Every request runs inside an `http_request` span carrying a correlation
//! id, so the workflow's log lines (search, commit, notification) for one
//! visitor request can be grouped.
//!
//! # Flow
//!
//! 1. **Extract** the id from the `X-Correlation-ID` header, or generate a UUID
//! 2. **Store** it in request extensions
//! 3. **Run** the inner service inside a span with a `correlation_id` field
//! 4. **Echo** the id in the response's `X-Correlation-ID` header

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create a layer that adds correlation ID tracking to all requests.
///
/// ```ignore
/// let app = Router::new()
///     .route("/search-availability", get(search_page))
///     .layer(correlation_id_layer());
/// ```
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::{Extension, Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route(
                "/id",
                get(|Extension(id): Extension<Uuid>| async move { id.to_string() }),
            )
            .layer(correlation_id_layer())
    }

    fn header(response: &Response) -> String {
        response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert!(Uuid::parse_str(&header(&response)).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(header(&response), request_uuid.to_string());
    }

    #[tokio::test]
    async fn test_correlation_id_in_extensions() {
        let request = Request::builder().uri("/id").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();
        let echoed = header(&response);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();

        assert_eq!(body, echoed.as_bytes());
    }

    #[tokio::test]
    async fn test_invalid_uuid_generates_new() {
        let request = Request::builder()
            .uri("/")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let id = header(&response);

        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, "not-a-uuid");
    }
}
