//! Decoder for the HTTP request prolog and header block.
//!
//! This module turns raw buffered bytes into a structured [`RequestHead`]
//! plus the payload size declared by the headers. Parsing is delegated to
//! `httparse`, which validates the `METHOD SP TARGET SP VERSION` prolog and
//! the `name: value` shape of every header line in a single pass, so there
//! is no suspension point between prolog and header parsing.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header section size: configurable (default 8 KiB)
//!
//! The size limit is enforced on partial parses as well: a client feeding
//! an endless unterminated header line is rejected once the buffered bytes
//! exceed the cap, instead of growing the buffer without bound.
//!
//! # Header semantics
//!
//! Header names are case-insensitive; when a request repeats a header name
//! the last value wins. Body framing is derived from `Content-Length`
//! alone; chunked transfer encoding is not part of this server's surface.

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Request, Version, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHead};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Default maximum size in bytes allowed for the entire header section
pub(crate) const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Minimum bytes a complete request head can occupy ("GET / HTTP/1.1\r\n\r\n")
const MIN_REQUEST_BYTES: usize = 14;

/// Decoder for HTTP request heads implementing the [`Decoder`] trait.
pub struct HeaderDecoder {
    max_header_bytes: usize,
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self { max_header_bytes: DEFAULT_MAX_HEADER_BYTES }
    }
}

impl HeaderDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }
}

impl Decoder for HeaderDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a request head from the buffered bytes.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((head, payload_size)))` if a complete head was parsed
    /// - `Ok(None)` if more data is needed
    /// - `Err(ParseError)` on a protocol violation
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_REQUEST_BYTES {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut parsed_request = httparse::Request::new(&mut headers);

        let parsed_result = parsed_request.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(header_len) => {
                trace!(header_len, "parsed request head");
                ensure!(header_len <= self.max_header_bytes, ParseError::too_large_header(header_len, self.max_header_bytes));

                let version = match parsed_request.version {
                    Some(0) => Version::HTTP_10,
                    Some(1) => Version::HTTP_11,
                    v => return Err(ParseError::InvalidVersion(v)),
                };

                let mut builder = Request::builder()
                    .method(parsed_request.method.ok_or(ParseError::InvalidMethod)?)
                    .uri(parsed_request.path.ok_or(ParseError::InvalidUri)?)
                    .version(version);

                if let Some(header_map) = builder.headers_mut() {
                    header_map.reserve(parsed_request.headers.len());
                    for parsed_header in parsed_request.headers.iter() {
                        let name = HeaderName::from_bytes(parsed_header.name.as_bytes())
                            .map_err(|e| ParseError::invalid_header(e.to_string()))?;
                        let value = HeaderValue::from_bytes(parsed_header.value)
                            .map_err(|e| ParseError::invalid_header(e.to_string()))?;
                        // last value wins on duplicate header names
                        header_map.insert(name, value);
                    }
                }

                let head = RequestHead::from(builder.body(()).map_err(|e| ParseError::invalid_header(e.to_string()))?);
                let payload_size = parse_payload(&head)?;

                // the body (if any) starts a fresh buffering epoch
                src.advance(header_len);

                Ok(Some((head, payload_size)))
            }
            Status::Partial => {
                ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                Ok(None)
            }
        }
    }
}

/// Derives the payload size from the request headers.
///
/// Body framing is `Content-Length` only: absence of the header means the
/// request has no body.
fn parse_payload(head: &RequestHead) -> Result<PayloadSize, ParseError> {
    let Some(value) = head.headers().get(header::CONTENT_LENGTH) else {
        return Ok(PayloadSize::Empty);
    };

    let text = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
    let length =
        text.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {text} is not u64")))?;

    Ok(PayloadSize::Length(length))
}
