//! Protocol types shared by the codec and connection layers.
//!
//! This module holds the message framing types used by the request decoder
//! and response encoder, the request/response surface exposed to
//! application handlers, and the error taxonomy of the server:
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: codec frames
//! - [`RequestHead`], [`Request`]: the inbound side
//! - [`Response`], [`SetCookie`]: the outbound side
//! - [`HttpError`], [`ParseError`], [`SendError`]: failure taxonomy
//!
//! Protocol violations are represented as `ParseError` values returned from
//! the parsing layers rather than panics, so parser edge cases are testable
//! in isolation.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::Request;
pub use request::RequestHead;

mod response;
pub use response::Response;
pub use response::SetCookie;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
