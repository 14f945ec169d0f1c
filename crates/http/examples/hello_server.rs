use std::time::Duration;

use ember_http::handler::BoxError;
use ember_http::protocol::{Request, Response, SetCookie};
use ember_http::server::HttpServer;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let server = HttpServer::builder()
        .bind("127.0.0.1:8080")
        .read_timeout(Duration::from_secs(10))
        .handler_fn(hello)
        .build()
        .expect("server configuration is valid");

    let handle = server.start().await.expect("bind server");
    info!(local_addr = %handle.local_addr(), "try: curl -v http://127.0.0.1:8080/world");

    tokio::signal::ctrl_c().await.expect("ctrl-c signal");
    handle.shutdown().await;
}

async fn hello(request: Request, mut response: Response) -> Result<Response, BoxError> {
    info!(path = request.path(), "handling request");

    response.set_content_type("text/plain").set_charset("utf-8");
    response.add_cookie(SetCookie::new("visited", "1").path("/").http_only(true));
    response.write_str(&format!("Hello {}!\r\n", request.path().trim_start_matches('/')));

    if let Some(name) = request.post_param("name") {
        response.write_str(&format!("posted name: {name}\r\n"));
    }

    Ok(response)
}
