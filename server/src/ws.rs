use crate::{error::SessionError, game_manager::AppState};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt, FutureExt};
use shared::{ErrorCode, ServerMessage};
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::sync::mpsc;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Forward queued messages to the socket in the order they were produced.
    let forward = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to encode server message");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let player_id = uuid::Uuid::new_v4().to_string();
    state.add_player(player_id.clone(), tx);

    while let Some(frame) = receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!(player_id = %player_id, error = %err, "Socket error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let handled = AssertUnwindSafe(state.handle_text(&player_id, &text))
                    .catch_unwind()
                    .await;
                if handled.is_err() {
                    tracing::error!(player_id = %player_id, "Panic while handling message");
                    state.send_to(
                        &player_id,
                        ServerMessage::Error {
                            code: ErrorCode::MalformedMessage,
                            message: "Internal error while processing message".to_string(),
                        },
                    );
                }
            }
            Message::Binary(_) => {
                let err = SessionError::Malformed("expected a text frame".to_string());
                state.send_to(&player_id, err.to_message());
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    state.remove_player(&player_id).await;
    forward.abort();
}
