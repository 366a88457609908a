//! Controller error taxonomy
//!
//! Failures are explicit values, not unwound stacks: the reader rejects with
//! a `ReadError`, the writer with a `WriteError`, and handlers report through
//! `Failure`, which tags whether a message is safe to echo to the client.

use crate::transport::BoxError;
use thiserror::Error;

/// Failure while draining or decoding the request body.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The underlying chunk stream failed mid-body.
    #[error("request stream failed: {0}")]
    Stream(#[source] BoxError),

    /// Accumulated body bytes were not valid UTF-8.
    #[error("request body is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// Non-empty body text that is not valid JSON.
    #[error("invalid JSON in request body: {0}")]
    Json(#[from] serde_json::Error),

    /// Accumulated body grew past the configured size cap.
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// The body was already drained for this exchange.
    #[error("request body already consumed")]
    AlreadyConsumed,
}

/// Failure while writing the response envelope.
#[derive(Debug, Error)]
pub enum WriteError {
    /// An envelope was already written for this exchange. Calling a write
    /// path twice is a caller bug, not a condition the writer recovers from.
    #[error("response already written for this exchange")]
    AlreadyWritten,

    #[error("failed to serialize response body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write response: {0}")]
    Sink(#[from] std::io::Error),
}

/// Error channel for handlers and the error writer.
///
/// A `Message` is a descriptive, client-safe string and reaches the wire
/// verbatim. A `Fault` carries internal detail: it is logged in full but the
/// client only ever sees a fixed generic message.
#[derive(Debug)]
pub enum Failure {
    Message(String),
    Fault(BoxError),
}

impl Failure {
    /// Wrap any error as a structured fault.
    pub fn fault<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Fault(Box::new(error))
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}
