//! Body-level codecs for `Content-Length` framed payloads.

mod length_decoder;
mod length_encoder;

pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
