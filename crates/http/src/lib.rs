//! An embeddable asynchronous HTTP/1.1 server core
//!
//! This crate provides the socket-level request/response engine of the
//! project: it multiplexes many concurrent client connections with
//! asynchronous I/O on top of tokio, without relying on a higher-level web
//! framework. Routing, sessions and everything else application-shaped
//! live in the embedding application, which plugs in through a single
//! request-handler callback.
//!
//! # Features
//!
//! - HTTP/1.1 request parsing and response serialization
//! - Asynchronous, deadline-bounded I/O using tokio
//! - Keep-alive connections with strict per-request state isolation
//! - Expect-continue mechanism
//! - Url-encoded form and multipart body parsing
//! - Slow-client defense: every read and write is bounded by a timeout
//! - Clean, connection-scoped error handling
//!
//! # Example
//!
//! ```no_run
//! use ember_http::handler::BoxError;
//! use ember_http::protocol::{Request, Response};
//! use ember_http::server::HttpServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = HttpServer::builder()
//!         .bind("127.0.0.1:8080")
//!         .handler_fn(hello)
//!         .build()
//!         .expect("server configuration is valid");
//!
//!     let handle = server.start().await.expect("bind succeeds");
//!
//!     tokio::signal::ctrl_c().await.expect("ctrl-c signal");
//!     handle.shutdown().await;
//! }
//!
//! async fn hello(request: Request, mut response: Response) -> Result<Response, BoxError> {
//!     response.set_content_type("text/plain");
//!     response.write_str("Hello ");
//!     response.write_str(request.path());
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`server`]: Listener ownership, accept loop, connection registry and
//!   lifecycle control
//! - [`connection`]: The per-socket state machine
//! - [`codec`]: Wire-level encoding/decoding state machines
//! - [`content`]: Request body content parsers
//! - [`protocol`]: Protocol types and the error taxonomy
//! - [`handler`]: Request handler trait and adapters
//!
//! # Concurrency model
//!
//! Each accepted socket is driven by exactly one async task. Within a
//! connection, reads and writes are strictly sequential (at most one
//! outstanding operation per direction at any instant), so per-connection
//! state needs no locking. Connections are fully independent of each
//! other; the only shared mutable state is the live-connection registry.
//! Keep-alive requests on one connection are strictly serialized: request
//! N+1 is not parsed before response N is fully written.
//!
//! # Limitations
//!
//! - HTTP/1.1 only, `Content-Length` framing only (no chunked transfer)
//! - No TLS support (use a reverse proxy for HTTPS)
//! - Maximum number of headers: 64
//! - Header section and body sizes are capped (configurable)

pub mod codec;
pub mod connection;
pub mod content;
pub mod handler;
pub mod protocol;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
