//! Socket upgrades under the socket prefix.
//!
//! # Data Flow
//! ```text
//! GET /ws/<path> (upgrade)
//!     → handshake Request kept for the life of the channel
//!     → SocketHub::bind (starts push tasks for <path>)
//!     → send task: hub channel → client frames
//!     → recv task: client text → Engine::on_message → reply on the hub channel
//!     → close from either side → SocketHub::unbind
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Path, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};

use crate::action::Verb;
use crate::http::request::Request;
use crate::http::server::AppState;
use crate::registry::Engine;
use crate::socket::SocketChannel;

pub async fn socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    connect_info: Option<axum::Extension<ConnectInfo<SocketAddr>>>,
) -> Response {
    let socket_path = format!("/{}", path.trim_start_matches('/'));
    if !state.engine.accepts_socket(&socket_path) {
        tracing::debug!(path = %socket_path, "No socket actions on path");
        return (StatusCode::NOT_FOUND, format!("Not Found: WS {socket_path}")).into_response();
    }

    let target = match uri.query() {
        Some(query) => format!("{socket_path}?{query}"),
        None => socket_path.clone(),
    };
    let remote = connect_info.map(|axum::Extension(ConnectInfo(addr))| addr.to_string());
    let handshake = Request::from_parts(Verb::Ws, &target, headers, Vec::new(), remote);

    let engine = state.engine.clone();
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, engine, socket_path, handshake))
}

async fn handle_socket(socket: WebSocket, engine: Arc<Engine>, path: String, handshake: Request) {
    let SocketChannel {
        id,
        sender: outbound,
        mut receiver,
        ..
    } = engine.sockets().bind(&path, handshake.clone());
    tracing::info!(path = %path, channel = %id, "Socket connection established");

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = receiver.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_engine = engine.clone();
    let recv_path = path.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    let Some(reply) = recv_engine.on_message(&recv_path, &handshake, text.as_str()) else {
                        continue;
                    };
                    if outbound.send(reply).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    engine.sockets().unbind(&path, id);
    tracing::info!(path = %path, channel = %id, "Socket connection closed");
}
