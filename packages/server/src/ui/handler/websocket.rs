//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::SplitSink, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use unihub_shared::protocol::{OutboundEvent, ProtocolError, parse_outbound};

use crate::{domain::ConnectionId, ui::state::AppState};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    let authenticated = query.token.is_some_and(|t| !t.is_empty());
    ws.on_upgrade(move |socket| handle_socket(socket, state, authenticated))
}

/// Spawns a task that forwards queued frames to this client's socket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, authenticated: bool) {
    let id = ConnectionId::generate();
    tracing::info!("Client {} connected (authenticated: {})", id, authenticated);

    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    if let Err(e) = state.connect_participant_usecase.execute(id, tx).await {
        tracing::warn!("Failed to announce client {}: {}", id, e);
    }
    let mut send_task = pusher_loop(rx, sender);

    let state_for_recv = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => handle_frame(&state_for_recv, &id, text.as_str()).await,
                Ok(Message::Close(_)) => {
                    tracing::info!("Client {} requested close", id);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("WebSocket error from {}: {}", id, e);
                    break;
                }
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Err(e) = state.disconnect_participant_usecase.execute(&id).await {
        tracing::warn!("Failed to announce departure of {}: {}", id, e);
    }
}

async fn handle_frame(state: &AppState, id: &ConnectionId, text: &str) {
    let event = match parse_outbound(text) {
        Ok(event) => event,
        Err(ProtocolError::UnknownEvent(name)) => {
            tracing::debug!("Ignoring unknown event '{}' from {}", name, id);
            return;
        }
        Err(e) => {
            tracing::warn!("Discarding frame from {}: {}", id, e);
            return;
        }
    };

    match event {
        OutboundEvent::Connect { timestamp } => {
            tracing::debug!("Handshake from {} at {}", id, timestamp);
            if let Err(e) = state.connect_participant_usecase.greet(id).await {
                tracing::warn!("Failed to greet {}: {}", id, e);
            }
        }
        OutboundEvent::GetMessages => match state.get_messages_usecase.execute(id).await {
            Ok(count) => tracing::debug!("Sent {} history messages to {}", count, id),
            Err(e) => tracing::warn!("Failed to send history to {}: {}", id, e),
        },
        OutboundEvent::Message { text, member_data } => {
            let nickname = member_data.nickname.clone();
            match state.send_message_usecase.execute(text, member_data).await {
                Ok(_) => tracing::info!("Message from {} ({})", nickname, id),
                Err(e) => tracing::warn!("Rejected message from {}: {}", id, e),
            }
        }
    }
}
