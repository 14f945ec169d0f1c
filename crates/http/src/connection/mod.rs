//! HTTP connection handling module.
//!
//! This module provides the per-socket state machine of the server:
//! [`HttpConnection`] owns exactly one accepted socket, processes its
//! requests strictly one at a time and writes exactly one response per
//! request, then either loops for the next keep-alive request or disposes
//! the socket.
//!
//! # Features
//!
//! - Asynchronous, deadline-bounded reads and writes
//! - Keep-alive connection reuse with full per-request state isolation
//! - Expect-continue handling
//! - Best-effort static error page on protocol and handler failures
//! - Safe standalone use over any `AsyncRead`/`AsyncWrite` pair

mod http_connection;

pub use http_connection::HttpConnection;
