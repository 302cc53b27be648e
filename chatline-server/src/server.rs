//! Chat server core: shared state, WebSocket handler, and event routing.
//!
//! Clients connect to [`CHAT_PATH`] with their name in the `username` query
//! parameter, then exchange JSON events (see `chatline_proto::event`).
//! Each connection gets a reader loop that applies client events to the
//! [`RoomRegistry`] and a writer task that drains the connection's frame
//! channel onto the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chatline_proto::codec;
use chatline_proto::event::{ClientEvent, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::rooms::{ConnectionId, RoomRegistry};

/// Route the chat endpoint is served on.
pub const CHAT_PATH: &str = "/v1/chat";

/// Default maximum message length in characters.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4096;

/// Errors that can occur while starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The bound address could not be read back.
    #[error("failed to read local address: {0}")]
    LocalAddr(std::io::Error),
}

/// Shared server state.
pub struct ServerState {
    /// Connections and room membership.
    pub rooms: RoomRegistry,
    max_message_len: usize,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates state with the default message length limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_MESSAGE_LEN)
    }

    /// Creates state with a custom message length limit.
    #[must_use]
    pub fn with_config(max_message_len: usize) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            max_message_len,
        }
    }

    /// Maximum accepted message length in characters.
    #[must_use]
    pub const fn max_message_len(&self) -> usize {
        self.max_message_len
    }
}

/// Query parameters of the upgrade request.
#[derive(Debug, serde::Deserialize)]
struct ConnectParams {
    username: Option<String>,
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
///
/// Requests without a non-blank `username` are refused with 403.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<ServerState>>,
) -> Response {
    let Some(username) = params
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
    else {
        tracing::warn!("rejecting connection without username");
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, username, state))
        .into_response()
}

/// Handles an upgraded WebSocket connection for one user.
///
/// The connection is registered immediately; it joins a room only when the
/// client sends `join`. On disconnect the user leaves their room.
pub async fn handle_socket(socket: WebSocket, username: String, state: Arc<ServerState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = state.rooms.connect(&username, tx).await;
    tracing::info!(conn = id, username = %username, "client connected");

    // Writer: forward frames until the registry drops our channel.
    let mut write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                tracing::warn!(conn = id, "WebSocket write failed");
                return;
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_frame(id, text.as_str(), &reader_state).await;
                }
                Message::Close(_) => {
                    tracing::info!(conn = id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore binary, ping, pong frames.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.rooms.disconnect(id).await;
    tracing::info!(conn = id, username = %username, "client disconnected");
}

/// Applies one text frame from connection `id`.
async fn handle_text_frame(id: ConnectionId, frame: &str, state: &ServerState) {
    let event = match codec::decode_client(frame) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(conn = id, err = %e, "failed to decode client event");
            return;
        }
    };

    match event {
        ClientEvent::Join { room_name } => state.rooms.join(id, room_name).await,
        ClientEvent::Message { room_name, message } => {
            let len = message.chars().count();
            if len > state.max_message_len {
                tracing::warn!(
                    conn = id,
                    len,
                    max = state.max_message_len,
                    "message exceeds length limit"
                );
                return;
            }
            state.rooms.broadcast(id, &room_name, message).await;
        }
        ClientEvent::Ping { .. } => state.rooms.send_to(id, &ServerEvent::Pong).await,
    }
}

/// Starts the chat server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns [`ServerError`] if the TCP listener cannot bind to the address.
pub async fn start_server(addr: &str) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the chat server with a pre-configured [`ServerState`].
///
/// # Errors
///
/// Returns [`ServerError`] if the TCP listener cannot bind to the address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
    let app = axum::Router::new()
        .route(CHAT_PATH, axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let bound_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "chat server error");
        }
    });

    Ok((bound_addr, handle))
}
