//! Request body accumulation and JSON decoding
//!
//! Drains the request's chunk stream to its end, appending chunks strictly in
//! arrival order, then decodes the full buffer as UTF-8 text. An empty body
//! is a valid "no payload" outcome, not an error; anything else must be a
//! single JSON value.

use super::error::ReadError;
use crate::transport::RequestSource;
use serde_json::Value;

/// Drain the request stream and decode the accumulated body.
///
/// Resolves with `None` for an empty body and `Some(value)` for a decoded
/// JSON payload. Stream faults and decode failures surface as `ReadError`s.
/// Decoding starts only after the stream has signalled its end, so it always
/// sees the complete body.
///
/// `limit` caps the accumulated size: the read rejects with
/// `ReadError::TooLarge` as soon as the body would grow past it, which also
/// bounds chunked requests that declare no Content-Length.
pub async fn read_json_payload<R: RequestSource>(
    request: &mut R,
    limit: Option<u64>,
) -> Result<Option<Value>, ReadError> {
    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = request.next_chunk().await {
        let chunk = chunk.map_err(ReadError::Stream)?;
        if let Some(limit) = limit {
            if (buffer.len() + chunk.len()) as u64 > limit {
                return Err(ReadError::TooLarge { limit });
            }
        }
        buffer.extend_from_slice(&chunk);
    }

    let text = std::str::from_utf8(&buffer)?;
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(text)?))
}
