//! HTTP codec module for encoding and decoding HTTP messages.
//!
//! The codec layer is where the wire-level state machines live. It is built
//! on `tokio_util`'s [`Decoder`]/[`Encoder`](tokio_util::codec::Encoder)
//! traits so the connection can drive it through `FramedRead`/`FramedWrite`
//! without ever blocking a thread while bytes are awaited.
//!
//! - Request side: [`RequestDecoder`]: header parsing via the [`header`]
//!   module, `Content-Length` body consumption via the [`body`] module
//! - Response side: [`ResponseEncoder`]: header serialization first, then
//!   body emission
//!
//! Both sides enforce frame ordering (header before payload) and surface
//! protocol violations as typed errors rather than panics.
//!
//! [`Decoder`]: tokio_util::codec::Decoder

pub mod body;
pub mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
