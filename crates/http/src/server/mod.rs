//! Server construction, the accept loop and lifecycle control.
//!
//! [`HttpServer`] owns the listen configuration and the handler; calling
//! [`HttpServer::start`] binds the listener and spawns the accept loop,
//! returning a [`ServerHandle`] for lifecycle control. Every accepted
//! socket becomes an [`HttpConnection`] task registered in the live set;
//! a per-connection failure never terminates the accept loop.
//!
//! Stopping is two-staged: [`ServerHandle::stop`] signals, which closes
//! idle and prolog-stage connections while in-flight requests finish;
//! [`ServerHandle::shutdown`] additionally waits for the live set to drain.

use std::error::Error;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::connection::HttpConnection;
use crate::handler::{BoxError, Handler, make_handler};
use crate::protocol::{Request, Response};

mod config;
mod registry;
mod shutdown;

pub use config::ServerConfig;
pub use shutdown::Shutdown;

use registry::ConnectionRegistry;

/// Application hook invoked before the static error page is used, allowing
/// the error response to be customized. A body written by the hook
/// replaces the static resource.
pub type ErrorHook = Arc<dyn Fn(&mut Response, &(dyn Error + Send + Sync)) + Send + Sync>;

pub struct ServerBuilder {
    address: Option<io::Result<Vec<SocketAddr>>>,
    config: ServerConfig,
    handler: Option<Arc<dyn Handler>>,
    error_hook: Option<ErrorHook>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: None, config: ServerConfig::default(), handler: None, error_hook: None }
    }

    /// Sets the listen endpoint. Port 0 requests an OS-assigned ephemeral
    /// port; the bound address is available through
    /// [`ServerHandle::local_addr`].
    pub fn bind<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(|addrs| addrs.collect()));
        self
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn read_timeout(mut self, read_timeout: std::time::Duration) -> Self {
        self.config.read_timeout = read_timeout;
        self
    }

    pub fn write_timeout(mut self, write_timeout: std::time::Duration) -> Self {
        self.config.write_timeout = write_timeout;
        self
    }

    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.config.max_header_bytes = max_header_bytes;
        self
    }

    pub fn max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.config.max_body_bytes = max_body_bytes;
        self
    }

    pub fn server_name<S: Into<String>>(mut self, server_name: S) -> Self {
        self.config.server_name = server_name.into();
        self
    }

    pub fn handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Convenience wrapper registering an async function as the handler.
    pub fn handler_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
    {
        self.handler(make_handler(f))
    }

    pub fn error_hook(mut self, error_hook: ErrorHook) -> Self {
        self.error_hook = Some(error_hook);
        self
    }

    pub fn build(self) -> Result<HttpServer, ServerBuildError> {
        let address = self.address.ok_or(ServerBuildError::MissingAddress)??;
        let handler = self.handler.ok_or(ServerBuildError::MissingHandler)?;
        Ok(HttpServer { address, config: Arc::new(self.config), handler, error_hook: self.error_hook })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("listen address must be set")]
    MissingAddress,
    #[error("request handler must be set")]
    MissingHandler,
    #[error("invalid listen address: {0}")]
    InvalidAddress(#[from] io::Error),
}

/// An embeddable HTTP server: listen endpoint, configuration and the
/// request-dispatch extension point.
pub struct HttpServer {
    address: Vec<SocketAddr>,
    config: Arc<ServerConfig>,
    handler: Arc<dyn Handler>,
    error_hook: Option<ErrorHook>,
}

impl HttpServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the listener and spawns the accept loop.
    pub async fn start(self) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(self.address.as_slice()).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "server listening");

        let shutdown = Shutdown::new();
        let registry = Arc::new(ConnectionRegistry::new());

        let accept = tokio::spawn(accept_loop(
            listener,
            self.handler,
            self.config,
            self.error_hook,
            shutdown.clone(),
            Arc::clone(&registry),
        ));

        Ok(ServerHandle { local_addr, shutdown, registry, accept })
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    config: Arc<ServerConfig>,
    error_hook: Option<ErrorHook>,
    shutdown: Shutdown,
    registry: Arc<ConnectionRegistry>,
) {
    let mut shutdown_rx = shutdown.subscribe();
    loop {
        // a trigger that raced the subscription is visible through the flag
        if shutdown.is_triggered() {
            break;
        }
        let accepted = tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr) = match accepted {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        spawn_connection(stream, peer_addr, &handler, &config, &error_hook, &shutdown, &registry);
    }
    info!("accept loop stopped");
}

fn spawn_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: &Arc<dyn Handler>,
    config: &Arc<ServerConfig>,
    error_hook: &Option<ErrorHook>,
    shutdown: &Shutdown,
    registry: &Arc<ConnectionRegistry>,
) {
    let id = registry.register(peer_addr);
    let handler = Arc::clone(handler);
    let config = Arc::clone(config);
    let error_hook = error_hook.clone();
    let shutdown = shutdown.clone();
    let registry = Arc::clone(registry);

    tokio::spawn(async move {
        let (reader, writer) = stream.into_split();
        let mut connection =
            HttpConnection::with_config(reader, writer, config).with_peer_addr(peer_addr).with_shutdown(shutdown);
        if let Some(error_hook) = error_hook {
            connection = connection.with_error_hook(error_hook);
        }

        match connection.process(handler).await {
            Ok(()) => info!(%peer_addr, "connection closed"),
            Err(e) => error!(%peer_addr, cause = %e, "connection closed with error"),
        }

        registry.unregister(id);
    });
}

/// Lifecycle handle of a started server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    registry: Arc<ConnectionRegistry>,
    accept: JoinHandle<()>,
}

impl ServerHandle {
    /// The actually bound listen address; useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently open connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Signals the server to stop: the accept loop exits, idle and
    /// prolog-stage connections close, in-flight requests finish.
    pub fn stop(&self) {
        self.shutdown.trigger();
    }

    /// Stops the server and waits until the accept loop has exited and all
    /// live connections are disposed.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        if let Err(e) = self.accept.await {
            error!(cause = %e, "accept loop task failed");
        }
        self.registry.wait_idle().await;
        info!("server shut down");
    }
}
