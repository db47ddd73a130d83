//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: socket upgrades under the socket prefix, every
//!   other path to the engine
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Translate Axum requests into engine `Request`s and back
//! - Serve until the shutdown signal, then stop push tasks

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::action::Verb;
use crate::config::EngineConfig;
use crate::http::request::Request;
use crate::http::websocket;
use crate::lifecycle::Shutdown;
use crate::registry::Engine;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub rpc_prefix: Arc<str>,
    pub max_body_size: usize,
    pub max_message_size: usize,
}

/// HTTP front end of the engine.
pub struct HttpServer {
    router: Router,
    engine: Arc<Engine>,
    shutdown: Shutdown,
}

impl HttpServer {
    pub fn new(config: &EngineConfig, engine: Arc<Engine>) -> Self {
        let state = AppState {
            engine: engine.clone(),
            rpc_prefix: Arc::from(config.rpc.prefix.trim_end_matches('/')),
            max_body_size: config.listener.max_body_size,
            max_message_size: config.socket.max_message_size,
        };

        Self {
            router: Self::build_router(config, state),
            engine,
            shutdown: Shutdown::new(),
        }
    }

    /// Stop when `shutdown` fires instead of a private signal.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// The fully layered router, e.g. for `tower::ServiceExt::oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    #[allow(deprecated)]
    fn build_router(config: &EngineConfig, state: AppState) -> Router {
        let socket_route = format!("{}/{{*path}}", config.socket.prefix.trim_end_matches('/'));

        Router::new()
            .route(&socket_route, get(websocket::socket_handler))
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.http.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let shutdown = self.shutdown.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        self.engine.sockets().shutdown();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `/rpc/calc/add` → `/calc/add` when `prefix` is `/rpc`.
pub fn strip_rpc_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    path.strip_prefix(prefix).filter(|rest| rest.starts_with('/'))
}

/// Convert an Axum request into an engine request, buffering the body.
pub async fn read_request(request: axum::extract::Request, max_body_size: usize) -> Result<Request, Response> {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());
    let (parts, body) = request.into_parts();

    let verb: Verb = parts
        .method
        .as_str()
        .parse()
        .map_err(|e| (StatusCode::METHOD_NOT_ALLOWED, format!("{e}")).into_response())?;
    if verb == Verb::Ws {
        let rejection = (StatusCode::METHOD_NOT_ALLOWED, "WS is only reachable by upgrade");
        return Err(rejection.into_response());
    }

    let body = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|e| (StatusCode::PAYLOAD_TOO_LARGE, format!("failed to read body: {e}")).into_response())?;

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Ok(Request::from_parts(verb, uri, parts.headers, body.to_vec(), remote))
}

/// Every non-socket request: RPC under the RPC prefix, path routing otherwise.
async fn dispatch_handler(State(state): State<AppState>, request: axum::extract::Request) -> Response {
    let request = match read_request(request, state.max_body_size).await {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };

    let request_id = request.header("x-request-id").unwrap_or("unknown").to_string();
    tracing::debug!(request_id = %request_id, verb = %request.verb, path = %request.path, "Dispatching request");

    let rpc_path = strip_rpc_prefix(&state.rpc_prefix, &request.path).map(str::to_string);
    let response = match rpc_path {
        Some(path) => state.engine.handle_rpc(&path, request),
        None => state.engine.handle(request),
    };
    response.into_http()
}
