//! Transport capability seam
//!
//! The controller core never touches a concrete transport type. It consumes
//! two minimal capabilities: a readable byte-chunk source describing the
//! inbound exchange, and a writable sink with status/header setters for the
//! outbound one. The hyper adapter implements both; tests substitute mocks.

pub mod hyper;

use ::hyper::body::Bytes;

/// Boxed transport-level error carried by chunk results.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Inbound exchange descriptor: method, target, and an ordered chunk stream.
///
/// `next_chunk` yields body chunks strictly in arrival order and `None` once
/// the stream has signalled its end. Chunks must not be requested again after
/// `None`.
#[allow(async_fn_in_trait)]
pub trait RequestSource {
    fn method(&self) -> &str;

    /// Request target: path plus optional query string, e.g. `/items?id=5`.
    fn target(&self) -> &str;

    async fn next_chunk(&mut self) -> Option<Result<Bytes, BoxError>>;
}

/// Outbound exchange descriptor.
///
/// Status and headers must be set before the first `write`; `end` finalizes
/// the response and no further calls are allowed afterwards.
#[allow(async_fn_in_trait)]
pub trait ResponseSink {
    fn set_status(&mut self, status: u16);

    fn set_header(&mut self, name: &str, value: &str);

    async fn write(&mut self, bytes: Bytes) -> std::io::Result<()>;

    async fn end(&mut self) -> std::io::Result<()>;
}

#[cfg(test)]
pub mod mock {
    use super::{BoxError, RequestSource, ResponseSink};
    use ::hyper::body::Bytes;
    use std::collections::VecDeque;

    /// Scripted request: serves a fixed chunk sequence, then end-of-stream.
    pub struct MockRequest {
        method: String,
        target: String,
        chunks: VecDeque<Result<Bytes, BoxError>>,
    }

    impl MockRequest {
        pub fn new(method: &str, target: &str, chunks: Vec<Result<Bytes, BoxError>>) -> Self {
            Self {
                method: method.to_string(),
                target: target.to_string(),
                chunks: chunks.into_iter().collect(),
            }
        }

        /// Request with a single UTF-8 body chunk.
        pub fn with_body(method: &str, target: &str, body: &str) -> Self {
            Self::new(method, target, vec![Ok(Bytes::from(body.to_string()))])
        }

        /// Request whose stream ends without emitting any data.
        pub fn empty(method: &str, target: &str) -> Self {
            Self::new(method, target, vec![])
        }
    }

    impl RequestSource for MockRequest {
        fn method(&self) -> &str {
            &self.method
        }

        fn target(&self) -> &str {
            &self.target
        }

        async fn next_chunk(&mut self) -> Option<Result<Bytes, BoxError>> {
            self.chunks.pop_front()
        }
    }

    /// Recording sink: captures everything the writer does for assertions.
    #[derive(Default)]
    pub struct MockResponse {
        pub status: Option<u16>,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
        pub ended: bool,
    }

    impl MockResponse {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn body_text(&self) -> &str {
            std::str::from_utf8(&self.body).expect("mock body was not UTF-8")
        }

        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    impl ResponseSink for MockResponse {
        fn set_status(&mut self, status: u16) {
            self.status = Some(status);
        }

        fn set_header(&mut self, name: &str, value: &str) {
            self.headers.push((name.to_string(), value.to_string()));
        }

        async fn write(&mut self, bytes: Bytes) -> std::io::Result<()> {
            assert!(!self.ended, "write after end");
            self.body.extend_from_slice(&bytes);
            Ok(())
        }

        async fn end(&mut self) -> std::io::Result<()> {
            assert!(!self.ended, "end called twice");
            self.ended = true;
            Ok(())
        }
    }
}
