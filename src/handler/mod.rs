//! Request handling entry point
//!
//! Adapts one hyper exchange onto the controller capabilities and runs the
//! concrete controller. Route matching lives here as a flat method/path
//! match; the controller core deliberately has none of its own.

use crate::config::AppState;
use crate::controller::{Controller, Exchange, Failure, WriteError};
use crate::logger::Logger;
use crate::transport::hyper::{BufferedResponse, IncomingRequest};
use crate::transport::{RequestSource, ResponseSink};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use serde_json::{json, Value};
use std::sync::Arc;

/// Main entry point for HTTP request handling.
///
/// Bodies whose declared Content-Length exceeds `http.max_body_size` are
/// answered with a 413 envelope before any handler runs. Bodies without a
/// usable Content-Length (chunked requests) are still bounded by the same
/// limit during accumulation via the exchange's body cap.
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    logger: Arc<dyn Logger>,
) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let max_body_size = state.config.http.max_body_size;
    let oversized = exceeds_limit(&parts, max_body_size);

    let request = IncomingRequest::new(&parts, body);
    let mut exchange = Exchange::new(request, BufferedResponse::new(), Arc::clone(&logger));
    exchange.set_body_limit(max_body_size);
    let mut controller = AppController::new(exchange, state);

    let result = if oversized {
        write_payload_too_large(controller.exchange()).await
    } else {
        controller.on_request().await
    };
    if let Err(err) = result {
        logger.error(&format!("Failed to answer request: {err}"));
    }

    controller.into_sink().into_response()
}

/// Declared body size, when a parsable Content-Length header is present.
fn content_length(parts: &hyper::http::request::Parts) -> Option<u64> {
    parts
        .headers
        .get("content-length")?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Whether the declared body size exceeds the configured limit.
fn exceeds_limit(parts: &hyper::http::request::Parts, max_body_size: u64) -> bool {
    content_length(parts).is_some_and(|len| len > max_body_size)
}

/// Answer the 413 envelope for an oversized body.
async fn write_payload_too_large<R: RequestSource, S: ResponseSink>(
    exchange: &mut Exchange<R, S>,
) -> Result<Value, WriteError> {
    exchange
        .write_error(
            Failure::Message("Payload Too Large".to_string()),
            json!({}),
            413,
        )
        .await
}

/// The concrete controller for this server's endpoints.
pub struct AppController<R, S> {
    exchange: Exchange<R, S>,
    state: Arc<AppState>,
}

impl<R: RequestSource, S: ResponseSink> AppController<R, S> {
    pub fn new(exchange: Exchange<R, S>, state: Arc<AppState>) -> Self {
        Self { exchange, state }
    }

    pub fn into_sink(self) -> S {
        self.exchange.into_sink()
    }
}

impl<R: RequestSource, S: ResponseSink> Controller<R, S> for AppController<R, S> {
    fn exchange(&mut self) -> &mut Exchange<R, S> {
        &mut self.exchange
    }

    async fn on_request(&mut self) -> Result<Value, WriteError> {
        let method = self.exchange.method().to_string();
        let path = self.exchange.path().to_string();

        match (method.as_str(), path.as_str()) {
            ("GET", "/status") => {
                let uptime = self.state.started_at.elapsed().as_secs();
                self.exchange
                    .dispatch(move |_params, _payload| async move {
                        Ok(json!({ "status": "ok", "uptime_secs": uptime }))
                    })
                    .await
            }
            ("POST", "/echo") => {
                self.exchange
                    .dispatch(|_params, payload| async move {
                        Ok(payload.unwrap_or(Value::Null))
                    })
                    .await
            }
            ("GET", "/params") => {
                self.exchange
                    .dispatch(|params, _payload| async move { Ok(params.to_value()) })
                    .await
            }
            _ => self.exchange.write_not_found().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::memory::MemoryLogger;
    use crate::transport::mock::{MockRequest, MockResponse};

    fn controller(request: MockRequest) -> AppController<MockRequest, MockResponse> {
        let cfg = Config::load_from("no-such-config-file").unwrap();
        let state = Arc::new(AppState::new(&cfg));
        let exchange = Exchange::new(request, MockResponse::new(), MemoryLogger::new());
        AppController::new(exchange, state)
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let mut c = controller(MockRequest::empty("GET", "/status"));
        let envelope = c.on_request().await.unwrap();
        assert_eq!(envelope["status"], "ok");
        assert!(envelope["uptime_secs"].is_u64());

        let sink = c.into_sink();
        assert_eq!(sink.status, Some(200));
        assert_eq!(sink.header("Content-Type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_echo_endpoint_returns_payload() {
        let mut c = controller(MockRequest::with_body(
            "POST",
            "/echo",
            r#"{"name":"widget"}"#,
        ));
        let envelope = c.on_request().await.unwrap();
        assert_eq!(envelope, json!({"name": "widget"}));
    }

    #[tokio::test]
    async fn test_echo_endpoint_without_body() {
        let mut c = controller(MockRequest::empty("POST", "/echo"));
        c.on_request().await.unwrap();
        assert_eq!(c.into_sink().body_text(), "{\"payload\":null}\n");
    }

    #[tokio::test]
    async fn test_params_endpoint() {
        let mut c = controller(MockRequest::empty("GET", "/params?id=5&tag=a&tag=b"));
        let envelope = c.on_request().await.unwrap();
        assert_eq!(envelope, json!({"id": "5", "tag": ["a", "b"]}));
    }

    #[tokio::test]
    async fn test_unmatched_route_is_404() {
        let mut c = controller(MockRequest::empty("GET", "/missing"));
        c.on_request().await.unwrap();

        let sink = c.into_sink();
        assert_eq!(sink.status, Some(404));
        assert_eq!(
            sink.body_text(),
            "{\"payload\":{\"url\":\"/missing\"},\"error\":\"Not Found\"}\n"
        );
    }

    #[tokio::test]
    async fn test_wrong_method_is_404() {
        let mut c = controller(MockRequest::empty("DELETE", "/status"));
        c.on_request().await.unwrap();
        assert_eq!(c.into_sink().status, Some(404));
    }

    fn parts_with_headers(headers: &[(&str, &str)]) -> hyper::http::request::Parts {
        let mut builder = hyper::Request::builder().method("POST").uri("/echo");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_content_length_parses_declared_size() {
        let parts = parts_with_headers(&[("content-length", "42")]);
        assert_eq!(content_length(&parts), Some(42));
    }

    #[test]
    fn test_content_length_missing_or_unparsable() {
        assert_eq!(content_length(&parts_with_headers(&[])), None);
        let parts = parts_with_headers(&[("content-length", "not-a-number")]);
        assert_eq!(content_length(&parts), None);
    }

    #[test]
    fn test_exceeds_limit_on_declared_size_only() {
        assert!(exceeds_limit(
            &parts_with_headers(&[("content-length", "1025")]),
            1024
        ));
        // At the limit is allowed.
        assert!(!exceeds_limit(
            &parts_with_headers(&[("content-length", "1024")]),
            1024
        ));
        // No usable declaration defers to the accumulation cap.
        assert!(!exceeds_limit(&parts_with_headers(&[]), 1024));
        assert!(!exceeds_limit(
            &parts_with_headers(&[("content-length", "not-a-number")]),
            1024
        ));
    }

    #[tokio::test]
    async fn test_oversized_body_gets_413_envelope() {
        let request = MockRequest::with_body("POST", "/echo", "{\"big\":true}");
        let mut exchange = Exchange::new(request, MockResponse::new(), MemoryLogger::new());
        write_payload_too_large(&mut exchange).await.unwrap();

        let sink = exchange.into_sink();
        assert_eq!(sink.status, Some(413));
        assert_eq!(sink.header("Content-Type"), Some("application/json"));
        assert_eq!(
            sink.body_text(),
            "{\"payload\":{},\"error\":\"Payload Too Large\"}\n"
        );
    }
}
