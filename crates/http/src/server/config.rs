use std::time::Duration;

use crate::codec::header::DEFAULT_MAX_HEADER_BYTES;

/// Tunables consumed at server construction.
///
/// All limits exist to bound what a single hostile or broken client can
/// cost the process: buffer capacities bound memory, timeouts bound how
/// long a slow peer can hold a task, and the header/body caps bound
/// buffering driven by client-declared sizes.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Initial capacity of the per-connection read buffer.
    pub read_buffer_size: usize,
    /// Bytes reserved in the write buffer ahead of header serialization.
    pub write_buffer_size: usize,
    /// Deadline for any single read operation, including the wait for the
    /// next request on a keep-alive connection.
    pub read_timeout: Duration,
    /// Deadline for any single write operation.
    pub write_timeout: Duration,
    /// Upper bound for the request prolog + header section.
    pub max_header_bytes: usize,
    /// Upper bound for a declared request body length.
    pub max_body_bytes: u64,
    /// Banner reported in the `server:` header and the 100-continue
    /// interim response.
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8 * 1024,
            write_buffer_size: 4 * 1024,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_body_bytes: 2 * 1024 * 1024,
            server_name: concat!("ember-http/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}
