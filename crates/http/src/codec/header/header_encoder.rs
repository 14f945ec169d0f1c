//! Serializer for the response status line and header block.
//!
//! Writes the status line, the standard headers owned by this server
//! (`server` banner, assembled `content-type`, computed `content-length`),
//! the application-set custom headers and one `set-cookie` line per cookie,
//! terminated by a blank line.
//!
//! The `content-length` value is always computed from the actual buffered
//! body length; any value the application placed in the header map is
//! dropped in favor of the computed one.

use crate::protocol::{PayloadSize, Response, SendError};

use bytes::{BufMut, BytesMut};

use http::header;
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

pub struct HeaderEncoder {
    server_name: String,
    reserve: usize,
}

impl HeaderEncoder {
    pub fn new<S: Into<String>>(server_name: S, reserve: usize) -> Self {
        Self { server_name: server_name.into(), reserve }
    }
}

impl Encoder<(Response, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (Response, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, payload_size) = item;

        dst.reserve(self.reserve);

        let reason = head.reason().or_else(|| head.status().canonical_reason()).unwrap_or("Unknown");
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", head.status().as_str(), reason)?;

        if !head.headers().contains_key(header::SERVER) {
            write!(FastWrite(dst), "server: {}\r\n", self.server_name)?;
        }

        if let Some(content_type) = head.content_type() {
            match head.charset() {
                Some(charset) => write!(FastWrite(dst), "content-type: {content_type}; charset={charset}\r\n")?,
                None => write!(FastWrite(dst), "content-type: {content_type}\r\n")?,
            }
        }

        for (header_name, header_value) in head.headers().iter() {
            // content-length is computed below, the assembled content-type wins
            if *header_name == header::CONTENT_LENGTH {
                continue;
            }
            if *header_name == header::CONTENT_TYPE && head.content_type().is_some() {
                continue;
            }
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }

        write!(FastWrite(dst), "content-length: {}\r\n", payload_size.declared())?;

        for cookie in head.cookies() {
            write!(FastWrite(dst), "set-cookie: {}\r\n", cookie.header_value())?;
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// This is an optimization to avoid unnecessary bounds checking when writing
/// to the bytes buffer, since we've already reserved enough space.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SetCookie;
    use http::{HeaderValue, StatusCode};
    use std::time::Duration;

    fn encode(head: Response, payload_size: PayloadSize) -> String {
        let mut encoder = HeaderEncoder::new("test-server/0.1", 4 * 1024);
        let mut dst = BytesMut::new();
        encoder.encode((head, payload_size), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn minimal_response() {
        let wire = encode(Response::new(), PayloadSize::Empty);
        assert_eq!(wire, "HTTP/1.1 200 OK\r\nserver: test-server/0.1\r\ncontent-length: 0\r\n\r\n");
    }

    #[test]
    fn content_length_always_comes_from_the_payload_size() {
        let mut head = Response::new();
        head.insert_header(header::CONTENT_LENGTH, HeaderValue::from_static("999"));

        let wire = encode(head, PayloadSize::Length(2));
        assert!(wire.contains("content-length: 2\r\n"));
        assert!(!wire.contains("999"));
    }

    #[test]
    fn content_type_with_charset() {
        let mut head = Response::new();
        head.set_content_type("text/html").set_charset("utf-8");

        let wire = encode(head, PayloadSize::Empty);
        assert!(wire.contains("content-type: text/html; charset=utf-8\r\n"));
    }

    #[test]
    fn custom_status_and_reason() {
        let mut head = Response::new();
        head.set_status(StatusCode::NOT_FOUND).set_reason("Nothing Here");

        let wire = encode(head, PayloadSize::Empty);
        assert!(wire.starts_with("HTTP/1.1 404 Nothing Here\r\n"));
    }

    #[test]
    fn application_server_header_suppresses_the_banner() {
        let mut head = Response::new();
        head.insert_header(header::SERVER, HeaderValue::from_static("custom/9"));

        let wire = encode(head, PayloadSize::Empty);
        assert!(wire.contains("server: custom/9\r\n"));
        assert!(!wire.contains("test-server/0.1"));
    }

    #[test]
    fn one_set_cookie_line_per_cookie() {
        let mut head = Response::new();
        head.add_cookie(SetCookie::new("sid", "1").path("/"));
        head.add_cookie(SetCookie::new("theme", "dark").max_age(Duration::from_secs(60)));

        let wire = encode(head, PayloadSize::Empty);
        assert!(wire.contains("set-cookie: sid=1; Path=/\r\n"));
        assert!(wire.contains("set-cookie: theme=dark; Max-Age=60\r\n"));
        assert!(wire.ends_with("\r\n\r\n"));
    }

    #[test]
    fn cache_control_and_expires_are_plain_headers() {
        let mut head = Response::new();
        head.set_cache_control(HeaderValue::from_static("no-cache"));
        head.set_expires(HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"));

        let wire = encode(head, PayloadSize::Empty);
        assert!(wire.contains("cache-control: no-cache\r\n"));
        assert!(wire.contains("expires: Thu, 01 Jan 1970 00:00:00 GMT\r\n"));
    }

    #[test]
    fn redirect_carries_location() {
        let mut head = Response::new();
        head.redirect(HeaderValue::from_static("/elsewhere"));

        let wire = encode(head, PayloadSize::Empty);
        assert!(wire.starts_with("HTTP/1.1 302 Found\r\n"));
        assert!(wire.contains("location: /elsewhere\r\n"));
    }
}
