//! Request handler traits and adapters.
//!
//! A [`Handler`] is the single extension point applications plug into the
//! server: it receives the read-only [`Request`] view and the fresh
//! [`Response`] the connection created for this cycle, populates the
//! response and hands it back. The handler runs inline in the connection
//! task and must not assume a dedicated thread per request.
//!
//! Errors returned by a handler are funneled into the connection's
//! error-response path; they never escape to other connections.

use async_trait::async_trait;
use std::error::Error;
use std::future::Future;

use crate::protocol::{Request, Response};

pub type BoxError = Box<dyn Error + Send + Sync>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request, response: Response) -> Result<Response, BoxError>;
}

/// Adapter turning an async function into a [`Handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send,
{
    async fn handle(&self, request: Request, response: Response) -> Result<Response, BoxError> {
        (self.f)(request, response).await
    }
}

pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request, Response) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send,
{
    HandlerFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::RequestContent;
    use crate::protocol::RequestHead;
    use http::Request as HttpRequest;

    #[tokio::test]
    async fn handler_fn_forwards_request_and_response() {
        let handler = make_handler(|request: Request, mut response: Response| async move {
            response.write_str(request.path());
            Ok(response)
        });

        let head = RequestHead::from(HttpRequest::builder().uri("/echo").body(()).unwrap());
        let request = Request::new(head, RequestContent::None, None);
        let response = handler.handle(request, Response::new()).await.unwrap();
        assert_eq!(response.body_len(), "/echo".len());
    }
}
