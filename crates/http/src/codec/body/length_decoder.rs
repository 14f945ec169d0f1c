//! Decoder for request bodies framed by a `Content-Length` header, as
//! defined in [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Tracks the remaining body bytes and emits chunks until the declared
/// content length is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of bytes remaining to be read from the payload
    length: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// Decodes body bytes from the input buffer according to the content
    /// length.
    ///
    /// # Returns
    /// * `Ok(Some(PayloadItem::Eof))` when all bytes have been read
    /// * `Ok(Some(PayloadItem::Chunk(bytes)))` when a chunk was consumed
    /// * `Ok(None)` when more data is needed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.length == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        // Read the minimum of remaining length and available bytes
        let len = cmp::min(self.length, src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();

        self.length -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_is_limited_to_the_declared_length() {
        let mut buffer = BytesMut::from(&b"101234567890abcdef\r\n\r\n"[..]);

        let mut length_decoder = LengthDecoder::new(10);
        let payload = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(payload.is_chunk());

        let bytes = payload.as_bytes().unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(&bytes[..], b"1012345678");
        assert_eq!(&buffer[..], b"90abcdef\r\n\r\n");

        // once drained, the decoder reports eof without consuming more
        let eof = length_decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
        assert_eq!(&buffer[..], b"90abcdef\r\n\r\n");
    }

    #[test]
    fn waits_for_more_data_when_the_buffer_is_empty() {
        let mut decoder = LengthDecoder::new(4);
        let mut buffer = BytesMut::new();
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"ab");
        let first = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(first.as_bytes().map(|b| b.len()), Some(2));

        buffer.extend_from_slice(b"cd");
        let second = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(second.as_bytes().map(|b| b.len()), Some(2));

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
