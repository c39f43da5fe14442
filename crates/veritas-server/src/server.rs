//! HTTP server for a Veritas [`App`].
//!
//! Each request is decoded into a [`RequestContext`] (query string, body by
//! content type, headers, request id), dispatched through the app, and the
//! reply or error rendered back to HTTP.
//!
//! ## Example
//!
//! ```rust,no_run
//! use veritas::prelude::*;
//! use veritas_config::ServerConfig;
//! use veritas_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!     app.get("/", |_ctx: TypedContext| async { ApiResult::Ok("Veritas") }, RouteSpec::new())?;
//!
//!     Server::new(app, &ServerConfig::default())?.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::Request;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;
use veritas::decode::{decode_body_with_limit, decode_query};
use veritas::App;
use veritas_config::{ConfigError, ServerConfig};
use veritas_core::{ApiError, ApiResult, Reply, RequestContext, RequestId};
use veritas_telemetry::metrics::UNMATCHED_ROUTE;
use veritas_telemetry::{record_request, InFlightGuard};

use crate::response::{render_error, render_reply, HttpResponse, REQUEST_ID_HEADER};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server section of the configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error on the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves an [`App`] over HTTP/1.1.
pub struct Server {
    app: Arc<App>,
    addr: SocketAddr,
    shutdown_timeout: Duration,
    max_body_size: usize,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("addr", &self.addr)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Creates a server for `app` from the `[server]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the host is not an IP address or
    /// the body limit is zero.
    pub fn new(app: App, config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config.bind_addr()?;
        if config.max_body_size == 0 {
            return Err(
                ConfigError::invalid_value("server.max_body_size", "must be greater than 0").into(),
            );
        }

        Ok(Self {
            app: Arc::new(app),
            addr,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            max_body_size: config.max_body_size,
        })
    }

    /// Returns the configured listen address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the application being served.
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Binds the configured address and serves until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    ///
    /// After `shutdown` fires, no new connections are accepted and open
    /// ones are given up to the shutdown timeout to finish.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, shutdown).await {
                                    tracing::debug!(%remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!(
            timeout = ?server.shutdown_timeout,
            active = tracker.active_connections(),
            "waiting for open connections"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(server.shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move {
                Ok::<_, Infallible>(handle_request(&server.app, req, server.max_body_size).await)
            }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                // Finish the in-flight request, then close.
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }
}

/// Handles one HTTP request against `app`.
///
/// Never fails: decoding, routing and handler errors are rendered as JSON
/// error envelopes. The `x-request-id` header is reused when it holds a
/// UUID and generated otherwise, and is echoed on the response.
pub async fn handle_request<B>(app: &App, req: Request<B>, max_body_size: usize) -> HttpResponse
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let _in_flight = InFlightGuard::new();
    let started = Instant::now();

    let (parts, body) = req.into_parts();
    let request_id = parts
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(RequestId::parse)
        .unwrap_or_default();
    let request_id_str = request_id.to_string();
    let route = app
        .route_template(&parts.method, parts.uri.path())
        .unwrap_or(UNMATCHED_ROUTE)
        .to_string();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id_str,
        http.method = %parts.method,
        http.path = %parts.uri.path(),
        http.route = %route,
    );

    async move {
        let result = match read_body(body, max_body_size).await {
            Ok(bytes) => dispatch(app, &parts, &bytes, request_id, max_body_size).await,
            Err(error) => Err(error),
        };

        let response = match result {
            Ok(reply) => render_reply(reply, &request_id_str),
            Err(error) => {
                log_error(&error);
                render_error(&error, &request_id_str)
            }
        };

        let duration = started.elapsed();
        let status = response.status().as_u16();
        record_request(parts.method.as_str(), &route, status, duration);
        tracing::info!(
            http.status_code = status,
            duration_ms = duration.as_secs_f64() * 1000.0,
            "request completed"
        );

        response
    }
    .instrument(span)
    .await
}

async fn read_body<B>(body: B, limit: usize) -> ApiResult<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::bad_request(
            format!("request body exceeds the {limit} byte limit"),
        )),
        Err(e) => Err(ApiError::bad_request(format!("failed to read request body: {e}"))),
    }
}

async fn dispatch(
    app: &App,
    parts: &Parts,
    body: &[u8],
    request_id: RequestId,
    max_body_size: usize,
) -> ApiResult<Reply> {
    let query = decode_query(parts.uri.query())?;
    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let body = decode_body_with_limit(content_type, body, max_body_size)?;

    let ctx = RequestContext::new(parts.method.clone(), parts.uri.path())
        .with_query(query)
        .with_body(body)
        .with_headers(parts.headers.clone())
        .with_request_id(request_id);

    app.dispatch(ctx).await
}

fn log_error(error: &ApiError) {
    match error {
        ApiError::Internal { .. } | ApiError::MissingCapability { .. } => {
            tracing::error!(error = ?error, "request failed");
        }
        ApiError::Validation(err) => {
            tracing::debug!(
                section = err.section().map(|s| s.as_str()),
                error = %err,
                "request rejected"
            );
        }
        other => {
            tracing::debug!(error = %other, "request rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use http_body_util::Full;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use veritas::prelude::*;

    #[derive(Debug, Deserialize)]
    struct Search {
        test: String,
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.get("/", |_ctx: TypedContext| async { ApiResult::Ok("Veritas") }, RouteSpec::new())
            .unwrap();
        app.get(
            "/with-schema",
            |ctx: TypedContext<Value, Search, Value>| async move { ApiResult::Ok(ctx.query.test) },
            RouteSpec::new().query(Shape::object([("test", Shape::string())]).typed::<Search>()),
        )
        .unwrap();
        app.post(
            "/echo",
            |ctx: TypedContext| async move { ApiResult::Ok(Json(ctx.body)) },
            RouteSpec::new(),
        )
        .unwrap();
        app
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_bytes(response: HttpResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_server_new_rejects_hostname() {
        let config = ServerConfig {
            host: "localhost".into(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            Server::new(App::new(), &config),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn test_server_new_uses_config() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 3000,
            shutdown_timeout_secs: 5,
            ..ServerConfig::default()
        };
        let server = Server::new(App::new(), &config).unwrap();
        assert_eq!(server.addr().to_string(), "127.0.0.1:3000");
        assert_eq!(server.shutdown_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_handle_plain_route() {
        let app = test_app();
        let response = handle_request(&app, request(Method::GET, "/", ""), 1024).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        assert_eq!(&body_bytes(response).await[..], b"Veritas");
    }

    #[tokio::test]
    async fn test_handle_query_schema() {
        let app = test_app();
        let response =
            handle_request(&app, request(Method::GET, "/with-schema?test=hello", ""), 1024).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body_bytes(response).await[..], b"hello");
    }

    #[tokio::test]
    async fn test_handle_query_schema_missing_field() {
        let app = test_app();
        let response = handle_request(&app, request(Method::GET, "/with-schema", ""), 1024).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["section"], "query");
    }

    #[tokio::test]
    async fn test_handle_json_body() {
        let app = test_app();
        let response =
            handle_request(&app, request(Method::POST, "/echo", r#"{"a":1}"#), 1024).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_handle_malformed_json() {
        let app = test_app();
        let response = handle_request(&app, request(Method::POST, "/echo", "{"), 1024).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handle_body_over_limit() {
        let app = test_app();
        let response =
            handle_request(&app, request(Method::POST, "/echo", r#"{"a":"0123456789"}"#), 8).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("8 byte limit"));
    }

    #[tokio::test]
    async fn test_handle_not_found_and_method_not_allowed() {
        let app = test_app();
        let response = handle_request(&app, request(Method::GET, "/missing", ""), 1024).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = handle_request(&app, request(Method::DELETE, "/", ""), 1024).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[http::header::ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let app = test_app();
        let id = "0191d5a2-3b7c-7d4e-8f00-123456789abc";
        let req = Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, id)
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = handle_request(&app, req, 1024).await;
        assert_eq!(response.headers()[REQUEST_ID_HEADER], id);
    }

    #[tokio::test]
    async fn test_invalid_request_id_is_replaced() {
        let app = test_app();
        let req = Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "not-a-uuid")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = handle_request(&app, req, 1024).await;
        let echoed = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(RequestId::parse(echoed).is_some());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            shutdown_timeout_secs: 1,
            ..ServerConfig::default()
        };
        let server = Server::new(test_app(), &config).unwrap();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), server.serve(listener, shutdown))
            .await
            .expect("server should stop");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_reports_bind_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port,
            ..ServerConfig::default()
        };
        let server = Server::new(App::new(), &config).unwrap();

        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
