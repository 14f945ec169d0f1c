//! Request body content parsing.
//!
//! Once the header block is decoded, a body with a declared
//! `Content-Length` is routed into one of three parsing strategies keyed on
//! the main token of the `Content-Type` header (case-insensitive, any
//! `;`-delimited parameters ignored):
//!
//! - `application/x-www-form-urlencoded` → [`UrlEncodedParser`], producing
//!   posted form parameters
//! - `multipart/form-data` → [`MultipartParser`], producing boundary
//!   delimited [`Part`]s (a missing `boundary` parameter is a protocol
//!   error)
//! - anything else (or no `Content-Type` at all) → the raw fallback, which
//!   exposes the body bytes unparsed
//!
//! Parsers are fed payload chunks as the length decoder produces them and
//! are finalized once the declared length is consumed.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, header};
use mime::Mime;
use tracing::trace;

mod multipart;
mod urlencoded;

pub use multipart::Part;
pub(crate) use multipart::MultipartParser;
pub(crate) use urlencoded::UrlEncodedParser;

/// Parsed body content attached to a [`crate::protocol::Request`].
#[derive(Debug)]
pub enum RequestContent {
    /// The request had no body (no `Content-Length` header).
    None,
    /// Form parameters from an url-encoded body.
    Form(FormData),
    /// Parts from a multipart body.
    Multipart(Vec<Part>),
    /// Unparsed body bytes of an unknown content type.
    Raw(Bytes),
}

/// Ordered collection of posted form parameters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Looks up a parameter by name; on duplicates the last occurrence
    /// wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().rev().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The body parsing strategy selected for one request.
#[derive(Debug)]
pub(crate) enum ContentParser {
    Form(UrlEncodedParser),
    Multipart(MultipartParser),
    Raw(BytesMut),
}

impl ContentParser {
    /// Selects a parser from the request headers.
    ///
    /// `declared` is the Content-Length value, used to pre-size buffers;
    /// the connection has already checked it against the body cap.
    pub(crate) fn select(headers: &HeaderMap, declared: u64) -> Result<Self, crate::protocol::ParseError> {
        let capacity = declared as usize;

        let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok()) else {
            return Ok(Self::Raw(BytesMut::with_capacity(capacity)));
        };

        match content_type.parse::<Mime>() {
            Ok(mime) if mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED => {
                Ok(Self::Form(UrlEncodedParser::with_capacity(capacity)))
            }
            Ok(mime) if mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA => {
                let boundary = mime
                    .get_param(mime::BOUNDARY)
                    .ok_or(crate::protocol::ParseError::MissingBoundary)?
                    .as_str()
                    .to_owned();
                Ok(Self::Multipart(MultipartParser::new(boundary, capacity)))
            }
            Ok(_) => Ok(Self::Raw(BytesMut::with_capacity(capacity))),
            Err(e) => {
                trace!(content_type, cause = %e, "unparseable content type, treating body as raw");
                Ok(Self::Raw(BytesMut::with_capacity(capacity)))
            }
        }
    }

    /// Appends one payload chunk.
    pub(crate) fn feed(&mut self, chunk: Bytes) {
        match self {
            Self::Form(parser) => parser.feed(&chunk),
            Self::Multipart(parser) => parser.feed(&chunk),
            Self::Raw(buf) => buf.extend_from_slice(&chunk),
        }
    }

    /// Finalizes the parser once the declared length is consumed.
    pub(crate) fn finish(self) -> Result<RequestContent, crate::protocol::ParseError> {
        match self {
            Self::Form(parser) => Ok(RequestContent::Form(parser.finish()?)),
            Self::Multipart(parser) => Ok(RequestContent::Multipart(parser.finish()?)),
            Self::Raw(buf) => Ok(RequestContent::Raw(buf.freeze())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ParseError;
    use http::HeaderValue;

    fn headers_with_content_type(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn selects_form_parser_ignoring_parameters_and_case() {
        for content_type in ["application/x-www-form-urlencoded", "application/x-www-form-urlencoded; charset=UTF-8", "Application/X-WWW-Form-URLEncoded"] {
            let parser = ContentParser::select(&headers_with_content_type(Some(content_type)), 0).unwrap();
            assert!(matches!(parser, ContentParser::Form(_)), "content type {content_type}");
        }
    }

    #[test]
    fn selects_multipart_parser_with_boundary() {
        let headers = headers_with_content_type(Some("multipart/form-data; boundary=xyz"));
        let parser = ContentParser::select(&headers, 0).unwrap();
        assert!(matches!(parser, ContentParser::Multipart(_)));
    }

    #[test]
    fn multipart_without_boundary_is_a_protocol_error() {
        let headers = headers_with_content_type(Some("multipart/form-data"));
        let result = ContentParser::select(&headers, 0);
        assert!(matches!(result, Err(ParseError::MissingBoundary)));
    }

    #[test]
    fn unknown_and_missing_content_types_fall_back_to_raw() {
        for value in [Some("application/octet-stream"), Some("definitely not a mime type"), None] {
            let parser = ContentParser::select(&headers_with_content_type(value), 0).unwrap();
            assert!(matches!(parser, ContentParser::Raw(_)), "content type {value:?}");
        }
    }

    #[test]
    fn raw_parser_collects_chunks() {
        let mut parser = ContentParser::select(&HeaderMap::new(), 8).unwrap();
        parser.feed(Bytes::from_static(b"abcd"));
        parser.feed(Bytes::from_static(b"efgh"));
        match parser.finish().unwrap() {
            RequestContent::Raw(bytes) => assert_eq!(&bytes[..], b"abcdefgh"),
            other => panic!("expected raw content, got {other:?}"),
        }
    }

    #[test]
    fn form_data_last_value_wins() {
        let form = FormData::from_pairs(vec![("k".into(), "1".into()), ("k".into(), "2".into())]);
        assert_eq!(form.get("k"), Some("2"));
        assert_eq!(form.len(), 2);
    }
}
