//! Streaming decoder for complete HTTP requests.
//!
//! The decoder is a two-phase state machine, the state being carried by the
//! `length_decoder` field:
//!
//! - `None`: reading the prolog + header block via [`HeaderDecoder`]
//! - `Some(LengthDecoder)`: consuming a `Content-Length` framed body
//!
//! A body decoder is installed only for a non-zero declared length, so
//! bodiless requests never produce payload frames and the next poll parses
//! the next request head directly. This is what serializes keep-alive
//! requests on a connection.

use crate::codec::body::LengthDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHead};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    length_decoder: Option<LengthDecoder>,
}

impl RequestDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { header_decoder: HeaderDecoder::new(max_header_bytes), length_decoder: None }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder::default(), length_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHead, PayloadSize)>;
    type Error = ParseError;

    /// Attempts to decode the next request frame from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Message::Header(_)))`: a complete request head
    /// - `Ok(Some(Message::Payload(_)))`: a body chunk or its EOF marker
    /// - `Ok(None)`: need more data
    /// - `Err(_)`: protocol violation
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // body phase
        if let Some(length_decoder) = &mut self.length_decoder {
            let message = match length_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.length_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        // header phase
        let message = match self.header_decoder.decode(src)? {
            Some((head, payload_size)) => {
                if let PayloadSize::Length(length) = payload_size
                    && length > 0
                {
                    self.length_decoder = Some(LengthDecoder::new(length));
                }
                Some(Message::Header((head, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn decode_all(input: &[u8]) -> Vec<Message<(RequestHead, PayloadSize)>> {
        let mut decoder = RequestDecoder::default();
        let mut buf = BytesMut::from(input);
        let mut frames = Vec::new();
        while let Some(frame) = decoder.decode(&mut buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn post_with_body_yields_header_chunk_eof() {
        let frames = decode_all(b"POST /submit HTTP/1.1\r\nContent-Length: 7\r\n\r\na=1&b=2");
        assert_eq!(frames.len(), 3);

        match &frames[0] {
            Message::Header((head, payload_size)) => {
                assert_eq!(head.method(), &Method::POST);
                assert_eq!(*payload_size, PayloadSize::Length(7));
            }
            Message::Payload(_) => panic!("expected header frame"),
        }

        match &frames[1] {
            Message::Payload(PayloadItem::Chunk(bytes)) => assert_eq!(&bytes[..], b"a=1&b=2"),
            _ => panic!("expected body chunk"),
        }

        assert!(matches!(&frames[2], Message::Payload(PayloadItem::Eof)));
    }

    #[test]
    fn bodiless_requests_produce_no_payload_frames() {
        let frames = decode_all(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n");
        assert_eq!(frames.len(), 2);
        for (frame, path) in frames.iter().zip(["/a", "/b"]) {
            match frame {
                Message::Header((head, payload_size)) => {
                    assert_eq!(head.uri().path(), path);
                    assert!(payload_size.is_empty());
                }
                Message::Payload(_) => panic!("unexpected payload frame"),
            }
        }
    }

    #[test]
    fn content_length_zero_has_no_body_phase() {
        let frames = decode_all(b"POST /empty HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            Message::Header((_, payload_size)) => assert_eq!(*payload_size, PayloadSize::Length(0)),
            Message::Payload(_) => panic!("expected header frame"),
        }
    }

    #[test]
    fn body_split_across_reads() {
        let mut decoder = RequestDecoder::default();
        let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 6\r\n\r\nabc"[..]);

        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(Message::Header(_))));
        let first = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap().into_bytes().unwrap();
        assert_eq!(&first[..], b"abc");
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"def");
        let second = decoder.decode(&mut buf).unwrap().unwrap().into_payload_item().unwrap().into_bytes().unwrap();
        assert_eq!(&second[..], b"def");

        let eof = decoder.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(eof, Message::Payload(PayloadItem::Eof)));
    }
}
