//! Mutable response object populated by the application handler.
//!
//! The handler receives a fresh [`Response`] per request, sets status,
//! headers, cookies and writes body bytes into it; the connection then
//! serializes it. The emitted `Content-Length` is always computed from the
//! buffered body length; any value the application put into the header map
//! is overridden during encoding.

use std::fmt::Write as _;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};

/// A buffered HTTP response under construction.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    cookies: Vec<SetCookie>,
    content_type: Option<String>,
    charset: Option<String>,
    body: BytesMut,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates an empty `200 OK` response with no headers and no body.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            reason: None,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            content_type: None,
            charset: None,
            body: BytesMut::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Overrides the reason phrase of the status line. When unset the
    /// canonical reason of the status code is used.
    pub fn set_reason<S: Into<String>>(&mut self, reason: S) -> &mut Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any previous value of the same name.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn set_content_type<S: Into<String>>(&mut self, content_type: S) -> &mut Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Charset suffix appended to the content type on the wire, e.g.
    /// `text/html; charset=utf-8`.
    pub fn set_charset<S: Into<String>>(&mut self, charset: S) -> &mut Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn set_cache_control(&mut self, value: HeaderValue) -> &mut Self {
        self.headers.insert(header::CACHE_CONTROL, value);
        self
    }

    pub fn set_expires(&mut self, value: HeaderValue) -> &mut Self {
        self.headers.insert(header::EXPIRES, value);
        self
    }

    /// Turns the response into a `302 Found` redirect to `location`.
    pub fn redirect(&mut self, location: HeaderValue) -> &mut Self {
        self.status = StatusCode::FOUND;
        self.headers.insert(header::LOCATION, location);
        self
    }

    pub fn add_cookie(&mut self, cookie: SetCookie) -> &mut Self {
        self.cookies.push(cookie);
        self
    }

    pub fn cookies(&self) -> &[SetCookie] {
        &self.cookies
    }

    /// Appends bytes to the buffered response body.
    pub fn write<B: AsRef<[u8]>>(&mut self, bytes: B) -> &mut Self {
        self.body.extend_from_slice(bytes.as_ref());
        self
    }

    /// Appends a string to the buffered response body.
    pub fn write_str(&mut self, text: &str) -> &mut Self {
        self.write(text.as_bytes())
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn body_is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Detaches the buffered body for encoding. The response keeps its
    /// metadata so the header encoder can still read it afterwards.
    pub(crate) fn take_body(&mut self) -> Bytes {
        self.body.split().freeze()
    }
}

/// A single `Set-Cookie` response header.
///
/// Expiry is expressed through `Max-Age` so no date formatting is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    path: Option<String>,
    domain: Option<String>,
    max_age: Option<Duration>,
    secure: bool,
    http_only: bool,
}

impl SetCookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            secure: false,
            http_only: false,
        }
    }

    pub fn path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            let _ = write!(out, "; Path={path}");
        }
        if let Some(domain) = &self.domain {
            let _ = write!(out, "; Domain={domain}");
        }
        if let Some(max_age) = &self.max_age {
            let _ = write!(out, "; Max-Age={}", max_age.as_secs());
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}
