//! Parser for `multipart/form-data` request bodies.
//!
//! The body is a sequence of sections delimited by `--<boundary>` lines as
//! specified in [RFC 7578](https://www.rfc-editor.org/rfc/rfc7578). Each
//! section carries its own small header block (`Content-Disposition` with a
//! mandatory `name` parameter, optionally `filename` and `Content-Type`)
//! followed by a blank line and the part content. Parsing identical bytes
//! always yields identical part sets.

use std::io;

use bytes::{Buf, Bytes, BytesMut};

use crate::protocol::ParseError;

/// One decoded section of a multipart body.
///
/// A part is either a plain form value (no `filename` parameter, value
/// accessible through [`value`](Self::value)) or an uploaded file whose
/// content is reachable as bytes or through [`reader`](Self::reader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// The `name` parameter of the part's `Content-Disposition` header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `filename` parameter, present only for file uploads.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The part's own `Content-Type` header, if it carried one.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// The raw content bytes of this part.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The part content as a form value. `None` for file uploads and for
    /// content that is not valid UTF-8.
    pub fn value(&self) -> Option<&str> {
        if self.is_file() {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }

    /// A `std::io::Read` view over the part content.
    pub fn reader(&self) -> impl io::Read + use<> {
        self.data.clone().reader()
    }
}

/// Accumulates the body bytes and splits them into [`Part`]s on finish.
#[derive(Debug)]
pub(crate) struct MultipartParser {
    boundary: String,
    buf: BytesMut,
}

impl MultipartParser {
    pub(crate) fn new(boundary: String, capacity: usize) -> Self {
        Self { boundary, buf: BytesMut::with_capacity(capacity) }
    }

    pub(crate) fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub(crate) fn finish(self) -> Result<Vec<Part>, ParseError> {
        parse_parts(&self.buf.freeze(), &self.boundary)
    }
}

fn parse_parts(body: &Bytes, boundary: &str) -> Result<Vec<Part>, ParseError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let open_delimiter = format!("--{boundary}");
    let part_delimiter = format!("\r\n--{boundary}");

    let mut cursor = find(body, open_delimiter.as_bytes())
        .ok_or_else(|| ParseError::invalid_body("multipart body has no opening boundary"))?
        + open_delimiter.len();

    let mut parts = Vec::new();
    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            // close delimiter, anything after it is an epilogue
            return Ok(parts);
        }
        if !rest.starts_with(b"\r\n") {
            return Err(ParseError::invalid_body("malformed multipart boundary line"));
        }
        cursor += 2;

        let section_len = find(&body[cursor..], part_delimiter.as_bytes())
            .ok_or_else(|| ParseError::invalid_body("unterminated multipart section"))?;
        parts.push(parse_part(body.slice(cursor..cursor + section_len))?);
        cursor += section_len + part_delimiter.len();
    }
}

fn parse_part(section: Bytes) -> Result<Part, ParseError> {
    let header_len = find(&section, b"\r\n\r\n")
        .ok_or_else(|| ParseError::invalid_body("multipart section has no header terminator"))?;
    let data = section.slice(header_len + 4..);

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    let header_block = &section[..header_len];
    for line in header_block.split(|&b| b == b'\n') {
        let line = std::str::from_utf8(line)
            .map_err(|_| ParseError::invalid_body("multipart section header is not valid ascii"))?
            .trim_end_matches('\r')
            .trim();
        if line.is_empty() {
            continue;
        }
        let (header_name, header_value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::invalid_body("multipart section header has no colon"))?;
        let header_value = header_value.trim();

        if header_name.trim().eq_ignore_ascii_case("content-disposition") {
            for parameter in header_value.split(';').skip(1) {
                if let Some((key, value)) = parameter.split_once('=') {
                    match key.trim() {
                        "name" => name = Some(unquote(value.trim()).to_owned()),
                        "filename" => filename = Some(unquote(value.trim()).to_owned()),
                        _ => {}
                    }
                }
            }
        } else if header_name.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(header_value.to_owned());
        }
    }

    let name = name.ok_or_else(|| ParseError::invalid_body("multipart section has no name parameter"))?;
    Ok(Part { name, filename, content_type, data })
}

fn unquote(value: &str) -> &str {
    value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)
}

/// First occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
