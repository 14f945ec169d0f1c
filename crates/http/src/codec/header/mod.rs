//! Header-level codecs: request head decoding and response head encoding.

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub(crate) use header_decoder::DEFAULT_MAX_HEADER_BYTES;
pub use header_encoder::HeaderEncoder;
