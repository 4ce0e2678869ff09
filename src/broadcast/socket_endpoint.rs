//! The WebSocket endpoint that clients connect to for the live feed.
//!
//! On connect the client receives a `connected` frame carrying its socket
//! ID, then manages its topic subscriptions with `subscribe`/`unsubscribe`
//! frames. Browsers cannot set headers on upgrade requests, so the API token
//! travels in the `token` query parameter.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        FromRef, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use rusqlite::Connection;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    AppState, Error,
    auth::authenticate_token,
    broadcast::{BroadcastHub, ServerFrame},
};

/// The state needed to serve the WebSocket feed.
#[derive(Clone)]
pub(crate) struct SocketState {
    /// The database connection for validating tokens.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The hub that connections register with.
    pub hub: Arc<BroadcastHub>,
}

impl FromRef<AppState> for SocketState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            hub: state.hub.clone(),
        }
    }
}

/// Query parameters for the WebSocket upgrade request.
#[derive(Debug, Deserialize)]
pub(crate) struct SocketQuery {
    /// The client's API token.
    #[serde(default)]
    pub token: Option<String>,
}

/// A frame sent from a client to the server.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum ClientFrame {
    /// Start receiving messages published to `channel`.
    Subscribe {
        /// The topic to subscribe to.
        channel: String,
    },
    /// Stop receiving messages published to `channel`.
    Unsubscribe {
        /// The topic to unsubscribe from.
        channel: String,
    },
}

/// A route handler that authenticates the client and upgrades the request to
/// a WebSocket connection.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub(crate) async fn websocket_endpoint(
    ws: WebSocketUpgrade,
    Query(query): Query<SocketQuery>,
    State(state): State<SocketState>,
) -> Response {
    let Some(token) = query.token else {
        return Error::Unauthorized.into_response();
    };

    {
        let connection = state.db_connection.lock().unwrap();

        if let Err(error) = authenticate_token(&token, &connection) {
            if error != Error::Unauthorized {
                tracing::error!("token lookup failed during upgrade: {error}");
            }
            return Error::Unauthorized.into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Drive one WebSocket connection until the client goes away.
async fn handle_socket(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (socket_id, receiver) = hub.connect();
    tracing::debug!(%socket_id, "new feed connection");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The client needs its socket ID before anything else so it can exclude
    // itself from its own writes.
    let connected = ServerFrame::Connected { socket_id };
    if send_frame(&mut ws_sender, &connected).await.is_err() {
        hub.disconnect(socket_id);
        return;
    }

    let send_task = tokio::spawn(forward_frames(receiver, ws_sender));

    while let Some(result) = ws_receiver.next().await {
        let message = match result {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(%socket_id, "feed connection errored: {error}");
                break;
            }
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
                Ok(ClientFrame::Subscribe { channel }) => hub.subscribe(socket_id, &channel),
                Ok(ClientFrame::Unsubscribe { channel }) => hub.unsubscribe(socket_id, &channel),
                Err(error) => {
                    tracing::debug!(%socket_id, "ignoring unparseable client frame: {error}")
                }
            },
            Message::Close(_) => break,
            // Pings are answered by axum; other frame kinds are ignored.
            _ => {}
        }
    }

    hub.disconnect(socket_id);
    send_task.abort();
    tracing::debug!(%socket_id, "feed connection closed");
}

/// Forward frames from the hub queue to the WebSocket until either side
/// closes.
async fn forward_frames(
    mut receiver: mpsc::UnboundedReceiver<ServerFrame>,
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
) {
    while let Some(frame) = receiver.recv().await {
        if send_frame(&mut ws_sender, &frame).await.is_err() {
            break;
        }
    }
}

async fn send_frame(
    ws_sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(error) => {
            tracing::error!("could not serialize server frame: {error}");
            return Ok(());
        }
    };

    ws_sender.send(Message::Text(json.into())).await
}
