//! JSON controller core
//!
//! One `Exchange` owns one request/response pair start to finish and funnels
//! every outcome, success or failure, through a single JSON envelope writer.
//! Concrete controllers implement `Controller` on top of it and use
//! `dispatch` to run a handler against the decoded query parameters and body
//! payload.

pub mod body;
pub mod error;
pub mod params;

pub use error::{Failure, ReadError, WriteError};
pub use params::{ParamValue, Params};

use crate::logger::Logger;
use crate::transport::{BoxError, RequestSource, ResponseSink};
use hyper::body::Bytes;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

/// One request/response pair, exclusively owned by a single dispatch chain.
///
/// Exactly one envelope write happens per exchange; the body stream is
/// drained at most once.
pub struct Exchange<R, S> {
    request: R,
    response: S,
    logger: Arc<dyn Logger>,
    body_limit: Option<u64>,
    body_consumed: bool,
    written: bool,
}

impl<R: RequestSource, S: ResponseSink> Exchange<R, S> {
    pub fn new(request: R, response: S, logger: Arc<dyn Logger>) -> Self {
        Self {
            request,
            response,
            logger,
            body_limit: None,
            body_consumed: false,
            written: false,
        }
    }

    /// Cap the accumulated request body size for this exchange.
    ///
    /// A body that grows past the cap mid-stream rejects with
    /// `ReadError::TooLarge`, which also bounds chunked requests that carry
    /// no Content-Length for the hosting layer to check up front.
    pub fn set_body_limit(&mut self, limit: u64) {
        self.body_limit = Some(limit);
    }

    pub fn method(&self) -> &str {
        self.request.method()
    }

    pub fn target(&self) -> &str {
        self.request.target()
    }

    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        let target = self.request.target();
        target.split_once('?').map_or(target, |(path, _)| path)
    }

    /// Query parameters, recomputed from the target on every call.
    pub fn params(&self) -> Params {
        Params::parse(self.request.target())
    }

    /// Drain the request stream and decode the JSON payload.
    ///
    /// The body is consumed at most once per exchange; a second call is
    /// rejected with `ReadError::AlreadyConsumed`.
    pub async fn read_payload(&mut self) -> Result<Option<Value>, ReadError> {
        if self.body_consumed {
            return Err(ReadError::AlreadyConsumed);
        }
        self.body_consumed = true;
        body::read_json_payload(&mut self.request, self.body_limit).await
    }

    /// Serialize `data` into the response envelope and finalize the response.
    ///
    /// Object-like values (JSON objects and arrays) are written unchanged;
    /// anything else is wrapped as `{"payload": data}`. The wire body is the
    /// serialized JSON plus a single trailing newline. Returns the envelope
    /// that was written, pre-serialization.
    pub async fn write_json(&mut self, data: Value, status: u16) -> Result<Value, WriteError> {
        if self.written {
            return Err(WriteError::AlreadyWritten);
        }
        self.written = true;

        let envelope = if matches!(data, Value::Object(_) | Value::Array(_)) {
            data
        } else {
            json!({ "payload": data })
        };
        let text = serde_json::to_string(&envelope)?;

        self.response.set_status(status);
        self.response.set_header("Content-Type", "application/json");
        self.response.write(Bytes::from(format!("{text}\n"))).await?;
        self.response.end().await?;

        self.logger.info(&format!(
            "Request \"{} {}\" finished with {status}",
            self.request.method(),
            self.request.target()
        ));
        Ok(envelope)
    }

    /// Write an error envelope `{"payload": payload, "error": message}`.
    ///
    /// A structured fault is logged in full for operators and the client sees
    /// the fixed string `InternalError`; a descriptive message is passed
    /// through to the wire verbatim. Envelope assembly and finalization go
    /// through `write_json`, so all outbound bodies share one path.
    pub async fn write_error(
        &mut self,
        failure: Failure,
        payload: Value,
        status: u16,
    ) -> Result<Value, WriteError> {
        let message = match failure {
            Failure::Message(message) => message,
            Failure::Fault(fault) => {
                self.logger.error(&format!("Internal Error: {fault}"));
                "InternalError".to_string()
            }
        };
        self.write_json(json!({ "payload": payload, "error": message }), status)
            .await
    }

    /// Write the 404 envelope, echoing the requested target.
    pub async fn write_not_found(&mut self) -> Result<Value, WriteError> {
        let url = self.request.target().to_string();
        self.write_error(
            Failure::Message("Not Found".to_string()),
            json!({ "url": url }),
            404,
        )
        .await
    }

    /// Report a structured fault surfaced during dispatch.
    ///
    /// The fault is logged for operators; the client gets a 500 envelope with
    /// the fixed message `Internal Service Error` and never the fault detail.
    pub async fn handle_uncaught(&mut self, fault: BoxError) -> Result<Value, WriteError> {
        self.logger.error(&format!("Error: {fault}"));
        self.write_error(
            Failure::Message("Internal Service Error".to_string()),
            json!({}),
            500,
        )
        .await
    }

    /// Run `handler(params, payload)` and write its outcome.
    ///
    /// Exactly one envelope write happens: the success path for a resolved
    /// handler value, or the error path for a body-read failure or a handler
    /// failure. Resolves only after the corresponding write has completed,
    /// with the envelope that was written.
    pub async fn dispatch<F, Fut>(&mut self, handler: F) -> Result<Value, WriteError>
    where
        F: FnOnce(Params, Option<Value>) -> Fut,
        Fut: Future<Output = Result<Value, Failure>>,
    {
        let payload = match self.read_payload().await {
            Ok(payload) => payload,
            Err(ReadError::Stream(fault)) => {
                return self.write_error(Failure::Fault(fault), json!({}), 500).await;
            }
            Err(err) => {
                // Decode failures carry a client-safe description of their own.
                return self
                    .write_error(Failure::Message(err.to_string()), json!({}), 500)
                    .await;
            }
        };

        match handler(self.params(), payload).await {
            Ok(data) => self.write_json(data, 200).await,
            Err(Failure::Fault(fault)) => self.handle_uncaught(fault).await,
            Err(failure) => self.write_error(failure, json!({}), 500).await,
        }
    }

    /// Give the response sink back to the hosting transport.
    pub fn into_sink(self) -> S {
        self.response
    }
}

/// A concrete JSON controller over one exchange.
///
/// The hosting transport invokes `on_request` exactly once per exchange. The
/// default implementation answers the 404 envelope; controllers override it
/// to pick handlers and call `Exchange::dispatch`.
#[allow(async_fn_in_trait)]
pub trait Controller<R: RequestSource, S: ResponseSink> {
    fn exchange(&mut self) -> &mut Exchange<R, S>;

    async fn on_request(&mut self) -> Result<Value, WriteError> {
        self.exchange().write_not_found().await
    }
}
