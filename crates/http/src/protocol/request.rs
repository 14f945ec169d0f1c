//! HTTP request head and per-cycle request projection.
//!
//! [`RequestHead`] wraps the standard `http::Request<()>` produced by the
//! header decoder. [`Request`] is the read-only view handed to the request
//! handler for exactly one request/response cycle: the head plus whatever
//! the content parsers extracted from the body.

use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request as HttpRequest, Uri, Version, header};

use crate::content::{FormData, Part, RequestContent};

/// The parsed prolog and header block of an HTTP request.
#[derive(Debug)]
pub struct RequestHead {
    inner: HttpRequest<()>,
}

impl RequestHead {
    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns a mutable reference to the request's headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// True when the client asked for the connection to be reused after
    /// this request. Connection reuse is opt-in: only an explicit
    /// `Connection: keep-alive` keeps the socket open.
    pub fn keep_alive_requested(&self) -> bool {
        self.headers()
            .get(header::CONNECTION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("keep-alive"))
    }
}

/// Converts request parts into a RequestHead.
impl From<Parts> for RequestHead {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: HttpRequest::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHead.
impl From<HttpRequest<()>> for RequestHead {
    #[inline]
    fn from(inner: HttpRequest<()>) -> Self {
        Self { inner }
    }
}

/// The read-only request view dispatched to the application handler.
///
/// A `Request` is built once the whole body (if any) has been consumed and
/// parsed. It is handed to the handler by value and dropped when the
/// request/response cycle completes, so no per-request state can leak into
/// the next keep-alive iteration.
#[derive(Debug)]
pub struct Request {
    head: RequestHead,
    content: RequestContent,
    peer_addr: Option<SocketAddr>,
}

impl Request {
    pub(crate) fn new(head: RequestHead, content: RequestContent, peer_addr: Option<SocketAddr>) -> Self {
        Self { head, content, peer_addr }
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn uri(&self) -> &Uri {
        self.head.uri()
    }

    /// The path component of the request target.
    pub fn path(&self) -> &str {
        self.head.uri().path()
    }

    /// The query component of the request target, if any.
    pub fn query(&self) -> Option<&str> {
        self.head.uri().query()
    }

    pub fn version(&self) -> Version {
        self.head.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    /// Convenience accessor for a single header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// Address of the peer socket, when the connection knows it.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// The parsed body content of this request.
    pub fn content(&self) -> &RequestContent {
        &self.content
    }

    /// Form parameters decoded from an `application/x-www-form-urlencoded`
    /// body, if that parser ran.
    pub fn form(&self) -> Option<&FormData> {
        match &self.content {
            RequestContent::Form(form) => Some(form),
            _ => None,
        }
    }

    /// Looks up a single posted form parameter by name.
    ///
    /// On duplicate names the last occurrence wins, matching the header
    /// semantics of this server.
    pub fn post_param(&self, name: &str) -> Option<&str> {
        self.form().and_then(|form| form.get(name))
    }

    /// Parts decoded from a `multipart/form-data` body. Empty for any
    /// other content type.
    pub fn parts(&self) -> &[Part] {
        match &self.content {
            RequestContent::Multipart(parts) => parts,
            _ => &[],
        }
    }

    /// The raw body bytes, for requests whose content type no structured
    /// parser claimed.
    pub fn raw_body(&self) -> Option<&Bytes> {
        match &self.content {
            RequestContent::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_with_connection(value: Option<&str>) -> RequestHead {
        let mut builder = HttpRequest::builder().method(Method::GET).uri("/");
        if let Some(value) = value {
            builder = builder.header(header::CONNECTION, value);
        }
        RequestHead::from(builder.body(()).unwrap())
    }

    #[test]
    fn keep_alive_is_opt_in() {
        assert!(!head_with_connection(None).keep_alive_requested());
        assert!(!head_with_connection(Some("close")).keep_alive_requested());
        assert!(head_with_connection(Some("keep-alive")).keep_alive_requested());
        assert!(head_with_connection(Some("Keep-Alive")).keep_alive_requested());
        assert!(head_with_connection(Some("  keep-alive  ")).keep_alive_requested());
    }

    #[test]
    fn post_param_lookup() {
        let head = head_with_connection(None);
        let form = FormData::from_pairs(vec![("a".into(), "1".into()), ("b".into(), "2".into()), ("a".into(), "3".into())]);
        let request = Request::new(head, RequestContent::Form(form), None);

        assert_eq!(request.post_param("a"), Some("3"));
        assert_eq!(request.post_param("b"), Some("2"));
        assert_eq!(request.post_param("c"), None);
        assert!(request.parts().is_empty());
        assert!(request.raw_body().is_none());
    }
}
