//! Hyper adapter for the transport capabilities
//!
//! Bridges `hyper::Request<Incoming>` / `hyper::Response<Full<Bytes>>` onto
//! the `RequestSource` / `ResponseSink` seam. The response side buffers
//! status, headers and body until `end()`, because hyper's service model
//! wants one finished response value rather than a streaming sink.

use super::{BoxError, RequestSource, ResponseSink};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::http::request::Parts;
use hyper::Response;

/// `RequestSource` over a hyper request's parts and body.
///
/// Generic over the body type so the frame loop is exercisable with scripted
/// bodies; the server always instantiates it with `Incoming`.
pub struct IncomingRequest<B = Incoming> {
    method: String,
    target: String,
    body: B,
}

impl<B> IncomingRequest<B> {
    pub fn new(parts: &Parts, body: B) -> Self {
        Self {
            method: parts.method.to_string(),
            target: parts.uri.to_string(),
            body,
        }
    }
}

impl<B> RequestSource for IncomingRequest<B>
where
    B: hyper::body::Body<Data = Bytes> + Unpin,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    fn method(&self) -> &str {
        &self.method
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn next_chunk(&mut self) -> Option<Result<Bytes, BoxError>> {
        // Skip non-data frames (trailers) without ending the stream early.
        loop {
            match self.body.frame().await? {
                Ok(frame) => {
                    if let Ok(data) = frame.into_data() {
                        return Some(Ok(data));
                    }
                }
                Err(e) => return Some(Err(Box::new(e))),
            }
        }
    }
}

/// `ResponseSink` buffering into a hyper response.
pub struct BufferedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    ended: bool,
}

impl BufferedResponse {
    pub const fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
            ended: false,
        }
    }

    /// Convert the buffered exchange into a hyper response.
    ///
    /// A sink that was never finalized means the controller failed before
    /// producing an envelope; answer a plain 500 rather than a half-built
    /// response.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        if !self.ended {
            return Response::builder()
                .status(500)
                .header("Content-Type", "text/plain")
                .body(Full::new(Bytes::from("500 Internal Server Error")))
                .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())));
        }

        let mut builder = Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for BufferedResponse {
    fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    async fn write(&mut self, bytes: Bytes) -> std::io::Result<()> {
        if self.ended {
            return Err(std::io::Error::other("write after end"));
        }
        self.body.extend_from_slice(&bytes);
        Ok(())
    }

    async fn end(&mut self) -> std::io::Result<()> {
        if self.ended {
            return Err(std::io::Error::other("end called twice"));
        }
        self.ended = true;
        Ok(())
    }
}
