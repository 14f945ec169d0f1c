use bytes::BytesMut;

use crate::protocol::ParseError;

use super::FormData;

/// Parser for `application/x-www-form-urlencoded` bodies.
///
/// The whole body is buffered (it is bounded by the configured body cap)
/// and decoded in one pass on [`finish`](Self::finish), including
/// percent-escapes and `+`-encoded spaces.
#[derive(Debug)]
pub(crate) struct UrlEncodedParser {
    buf: BytesMut,
}

impl UrlEncodedParser {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity) }
    }

    pub(crate) fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub(crate) fn finish(self) -> Result<FormData, ParseError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&self.buf)
            .map_err(|e| ParseError::invalid_body(format!("url-encoded form: {e}")))?;
        Ok(FormData::from_pairs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> FormData {
        let mut parser = UrlEncodedParser::with_capacity(input.len());
        parser.feed(input);
        parser.finish().unwrap()
    }

    #[test]
    fn simple_pairs() {
        let form = parse(b"a=1&b=2");
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get("b"), Some("2"));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn decodes_escapes_and_plus() {
        let form = parse(b"a%20key=c+d&url=http%3A%2F%2Fexample.org");
        assert_eq!(form.get("a key"), Some("c d"));
        assert_eq!(form.get("url"), Some("http://example.org"));
    }

    #[test]
    fn empty_body_yields_empty_form() {
        assert!(parse(b"").is_empty());
    }

    #[test]
    fn chunked_feeding_is_equivalent() {
        let mut parser = UrlEncodedParser::with_capacity(7);
        parser.feed(b"a=");
        parser.feed(b"1&b");
        parser.feed(b"=2");
        let form = parser.finish().unwrap();
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get("b"), Some("2"));
    }
}
