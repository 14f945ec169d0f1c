use std::error::Error;
use std::io;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use http::{StatusCode, header};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::content::{ContentParser, RequestContent};
use crate::ensure;
use crate::handler::Handler;
use crate::protocol::{
    HttpError, Message, ParseError, PayloadItem, PayloadSize, Request, RequestHead, Response, SendError,
};
use crate::server::{ErrorHook, ServerConfig, Shutdown};

use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, trace};

/// Static body of the best-effort error response.
const ERROR_PAGE: &str = include_str!("../../resources/error_500.html");

type ResponseFrame = Message<(Response, PayloadSize)>;

/// The state machine driving one accepted socket.
///
/// A connection owns its socket halves for its whole lifetime and walks
/// every request through the same sequence: decode prolog + headers, honor
/// `Expect: 100-continue`, consume the body into a content parser, dispatch
/// the handler inline, write the buffered response (headers flushed before
/// the body), then either loop for the next keep-alive request or dispose.
///
/// The connection task performs at most one read and one write await at a
/// time, so all per-connection state is single-threaded by construction.
/// Every read and write is bounded by the configured deadline; an expired
/// deadline disposes the connection outside the normal state transitions,
/// which is the defense against peers that send data arbitrarily slowly.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    config: Arc<ServerConfig>,
    peer_addr: Option<SocketAddr>,
    shutdown: Option<Shutdown>,
    error_hook: Option<ErrorHook>,
    errored: bool,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, Arc::new(ServerConfig::default()))
    }

    pub fn with_config(reader: R, writer: W, config: Arc<ServerConfig>) -> Self {
        let decoder = RequestDecoder::new(config.max_header_bytes);
        let encoder = ResponseEncoder::new(config.server_name.clone(), config.write_buffer_size);
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, config.read_buffer_size),
            framed_write: FramedWrite::new(writer, encoder),
            config,
            peer_addr: None,
            shutdown: None,
            error_hook: None,
            errored: false,
        }
    }

    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    /// Attaches the server's shutdown signal. A connection waiting for the
    /// next request closes as soon as the signal fires.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Attaches the application hook that may rewrite the error response
    /// before the static fallback page is used.
    pub fn with_error_hook(mut self, error_hook: ErrorHook) -> Self {
        self.error_hook = Some(error_hook);
        self
    }

    /// Drives the connection until it is disposed.
    ///
    /// Returns `Ok(())` for orderly closure (peer disconnect, non-keep-alive
    /// completion, server stop) and an error for protocol violations, I/O
    /// failures, timeouts and handler failures. No error ever escapes to
    /// another connection; the caller only logs the outcome.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        let mut shutdown_rx = self.shutdown.as_ref().map(Shutdown::subscribe);

        // checked after subscribing: a trigger that raced the subscription
        // is visible through the flag, later ones through the channel
        if self.shutdown.as_ref().is_some_and(Shutdown::is_triggered) {
            info!("server stopping, closing connection");
            return Ok(());
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = recv_shutdown(&mut shutdown_rx) => {
                    info!("server stopping, closing connection");
                    return Ok(());
                }
                next = timeout(self.config.read_timeout, self.framed_read.next()) => next,
            };

            let message = match next {
                Err(_elapsed) => return Err(HttpError::timeout("read", self.config.read_timeout)),
                Ok(None) => {
                    trace!("peer closed the connection");
                    return Ok(());
                }
                Ok(Some(Err(e))) => return Err(self.dispose_with(e.into(), None).await),
                Ok(Some(Ok(message))) => message,
            };

            let (head, payload_size) = match message {
                Message::Header(header_frame) => header_frame,
                Message::Payload(_) => {
                    error!("received body bytes while expecting a request prolog");
                    let e = ParseError::invalid_body("expect request head while receiving body");
                    return Err(self.dispose_with(e.into(), None).await);
                }
            };

            // A stopping server closes connections that are still in the
            // prolog stage; requests past it are allowed to finish.
            if self.shutdown.as_ref().is_some_and(Shutdown::is_triggered) {
                info!("server stopping, dropping request before dispatch");
                return Ok(());
            }

            let keep_alive = head.keep_alive_requested();
            self.handle_request(head, payload_size, handler.as_ref()).await?;

            if !keep_alive {
                trace!("connection reuse not requested, closing");
                return Ok(());
            }
        }
    }

    /// Runs one request past the prolog stage: expectation handling, body
    /// consumption, dispatch and response write.
    async fn handle_request<H>(&mut self, mut head: RequestHead, payload_size: PayloadSize, handler: &H) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        if let Err(e) = self.handle_expect(&mut head).await {
            return Err(self.dispose_with(e, None).await);
        }

        let content = match self.read_content(&head, payload_size).await {
            Ok(content) => content,
            Err(e) => return Err(self.dispose_with(e, None).await),
        };

        let request = Request::new(head, content, self.peer_addr);
        let response = Response::new();

        match handler.handle(request, response).await {
            Ok(response) => self.write_response(response).await,
            Err(source) => {
                error!(cause = %source, "request handler failed");
                self.send_error_page(Some(source.as_ref())).await;
                Err(HttpError::HandlerError { source })
            }
        }
    }

    /// Honors `Expect: 100-continue` before the body is awaited.
    ///
    /// The header is removed from the request so the handler never sees it;
    /// any other expectation value is a protocol error.
    async fn handle_expect(&mut self, head: &mut RequestHead) -> Result<(), HttpError> {
        let Some(value) = head.headers().get(header::EXPECT) else {
            return Ok(());
        };

        let text = value
            .to_str()
            .map_err(|_| ParseError::invalid_header("expect value is not visible ascii"))?
            .to_owned();
        let token = text.split(';').next().unwrap_or_default().trim();
        ensure!(token.eq_ignore_ascii_case("100-continue"), ParseError::unsupported_expect(text).into());

        head.headers_mut().remove(header::EXPECT);

        let interim = format!("HTTP/1.1 100 Continue\r\nserver: {}\r\n\r\n", self.config.server_name);
        let writer = self.framed_write.get_mut();
        let write = async {
            writer.write_all(interim.as_bytes()).await?;
            writer.flush().await
        };
        match timeout(self.config.write_timeout, write).await {
            Err(_elapsed) => return Err(HttpError::timeout("write", self.config.write_timeout)),
            Ok(Err(e)) => return Err(SendError::io(e).into()),
            Ok(Ok(())) => {}
        }

        info!("expect header honored, interim continue response sent");
        Ok(())
    }

    /// Consumes the request body (if any) into the content parser selected
    /// by the `Content-Type` header.
    async fn read_content(&mut self, head: &RequestHead, payload_size: PayloadSize) -> Result<RequestContent, HttpError> {
        if payload_size.is_empty() {
            return Ok(RequestContent::None);
        }

        let declared = payload_size.declared();
        ensure!(
            declared <= self.config.max_body_bytes,
            ParseError::too_large_body(declared, self.config.max_body_bytes).into()
        );

        let mut parser = ContentParser::select(head.headers(), declared)?;

        if declared > 0 {
            loop {
                let item = match timeout(self.config.read_timeout, self.framed_read.next()).await {
                    Err(_elapsed) => return Err(HttpError::timeout("read", self.config.read_timeout)),
                    Ok(None) => return Err(ParseError::io(io::Error::from(ErrorKind::UnexpectedEof)).into()),
                    Ok(Some(Err(e))) => return Err(e.into()),
                    Ok(Some(Ok(Message::Header(_)))) => {
                        error!("received a request prolog while expecting body bytes");
                        return Err(ParseError::invalid_body("expect body while receiving request head").into());
                    }
                    Ok(Some(Ok(Message::Payload(item)))) => item,
                };

                match item {
                    PayloadItem::Chunk(chunk) => parser.feed(chunk),
                    PayloadItem::Eof => break,
                }
            }
        }

        Ok(parser.finish()?)
    }

    /// Serializes the handler's response: the header frame is flushed
    /// before any body byte, and the content length is computed from the
    /// buffered body.
    async fn write_response(&mut self, mut response: Response) -> Result<(), HttpError> {
        let body = response.take_body();
        let payload_size = if body.is_empty() { PayloadSize::Empty } else { PayloadSize::Length(body.len() as u64) };

        self.send_frame(Message::Header((response, payload_size))).await?;

        if !body.is_empty() {
            self.feed_frame(Message::Payload(PayloadItem::Chunk(body))).await?;
            self.send_frame(Message::Payload(PayloadItem::Eof)).await?;
        }

        Ok(())
    }

    /// Feeds a frame into the write buffer without flushing.
    async fn feed_frame(&mut self, frame: ResponseFrame) -> Result<(), HttpError> {
        match timeout(self.config.write_timeout, self.framed_write.feed(frame)).await {
            Err(_elapsed) => Err(HttpError::timeout("write", self.config.write_timeout)),
            Ok(result) => result.map_err(HttpError::from),
        }
    }

    /// Feeds a frame and flushes the underlying socket.
    async fn send_frame(&mut self, frame: ResponseFrame) -> Result<(), HttpError> {
        match timeout(self.config.write_timeout, self.framed_write.send(frame)).await {
            Err(_elapsed) => Err(HttpError::timeout("write", self.config.write_timeout)),
            Ok(result) => result.map_err(HttpError::from),
        }
    }

    /// Routes a failed request to its disposal behavior: protocol and
    /// handler failures get a best-effort error page, transport failures
    /// and timeouts are disposed of silently.
    async fn dispose_with(&mut self, error: HttpError, source: Option<&(dyn Error + Send + Sync)>) -> HttpError {
        let write_page = match &error {
            HttpError::RequestError { source } => !source.is_io(),
            HttpError::HandlerError { .. } => true,
            HttpError::ResponseError { .. } | HttpError::Timeout { .. } => false,
        };
        if write_page {
            self.send_error_page(source).await;
        }
        error
    }

    /// Best-effort `500` response from the static error resource. If the
    /// socket no longer accepts writes the connection is simply disposed
    /// without a response.
    async fn send_error_page(&mut self, source: Option<&(dyn Error + Send + Sync)>) {
        if self.errored {
            return;
        }
        self.errored = true;

        let mut response = Response::new();
        response.set_status(StatusCode::INTERNAL_SERVER_ERROR).set_content_type(mime::TEXT_HTML.as_ref()).set_charset("utf-8");

        if let (Some(hook), Some(source)) = (&self.error_hook, source) {
            (**hook)(&mut response, source);
        }
        if response.body_is_empty() {
            response.write_str(ERROR_PAGE);
        }

        if let Err(e) = self.write_response(response).await {
            debug!(cause = %e, "failed to write error response, disposing without one");
        }
    }
}

/// Resolves when the shutdown signal fires; never resolves for connections
/// running without a server.
async fn recv_shutdown(rx: &mut Option<broadcast::Receiver<()>>) {
    match rx {
        Some(rx) => {
            let _ = rx.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}
