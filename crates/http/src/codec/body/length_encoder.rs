use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

/// Emits response body bytes, tracking how many are still owed against the
/// `content-length` that was written in the header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
}

impl LengthEncoder {
    pub fn new(remaining: u64) -> Self {
        Self { remaining }
    }

    pub fn is_finish(&self) -> bool {
        self.remaining == 0
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if !bytes.has_remaining() {
                    return Ok(());
                }
                let len = bytes.remaining() as u64;
                if len > self.remaining {
                    warn!(len, remaining = self.remaining, "body chunk exceeds the declared content length");
                    return Err(SendError::invalid_body("body chunk exceeds the declared content length"));
                }
                dst.extend_from_slice(bytes.chunk());
                self.remaining -= len;
                Ok(())
            }
            PayloadItem::Eof => Ok(()),
        }
    }
}
