//! Streaming encoder for complete HTTP responses.
//!
//! Mirrors the two phases of the write side of the connection state
//! machine: a header frame must be encoded first (and is flushed before any
//! body byte leaves the process), then body chunks followed by the EOF
//! marker. Feeding frames out of order is a programming error surfaced as
//! `InvalidInput`.

use crate::codec::body::LengthEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadSize, Response, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
    body_encoder: Option<LengthEncoder>,
}

impl ResponseEncoder {
    pub fn new<S: Into<String>>(server_name: S, reserve: usize) -> Self {
        Self { header_encoder: HeaderEncoder::new(server_name, reserve), body_encoder: None }
    }
}

impl<D: Buf> Encoder<Message<(Response, PayloadSize), D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(Response, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.body_encoder.is_some() {
                    error!("expect payload item but receive response head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                if let PayloadSize::Length(length) = payload_size
                    && length > 0
                {
                    self.body_encoder = Some(LengthEncoder::new(length));
                }
                self.header_encoder.encode((head, payload_size), dst)
            }

            Message::Payload(payload_item) => {
                let Some(body_encoder) = &mut self.body_encoder else {
                    error!("expect response head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let is_eof = payload_item.is_eof();
                let result = body_encoder.encode(payload_item, dst);
                if is_eof {
                    self.body_encoder.take();
                }

                result
            }
        }
    }
}
