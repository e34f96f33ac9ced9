//! WebSocket connection handler.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use devicehub_shared::time::current_rfc3339;
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    protocol::{ClientMessage, ServerMessage},
    ui::state::{AppState, OFFLINE_USER_PREFIX},
};

/// Close code sent to users that are not online yet
const POLICY_VIOLATION: u16 = 1008;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    let (mut sender, mut receiver) = socket.split();

    if user_id.starts_with(OFFLINE_USER_PREFIX) {
        tracing::info!("Rejecting '{}': user not online", user_id);
        let frame = CloseFrame {
            code: POLICY_VIOLATION,
            reason: Utf8Bytes::from_static("user not online"),
        };
        if let Err(e) = sender.send(Message::Close(Some(frame))).await {
            tracing::warn!("Failed to send close frame to '{}': {}", user_id, e);
        }
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let session_id = state.register(&user_id, tx).await;
    tracing::info!("User '{}' connected", user_id);

    let ping_interval = state.config.ping_interval;

    // Spawn a task to forward pushed frames and periodic pings to this socket
    let mut send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            let text = tokio::select! {
                pushed = rx.recv() => match pushed {
                    Some(text) => text,
                    // replaced by a newer session
                    None => break,
                },
                _ = ticker.tick() => {
                    let ping = ServerMessage::Ping { timestamp: current_rfc3339() };
                    match serde_json::to_string(&ping) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize ping: {}", e);
                            continue;
                        }
                    }
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let state_for_recv = state.clone();
    let user_for_recv = user_id.clone();

    // Spawn a task to handle frames from this socket
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error from '{}': {}", user_for_recv, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_client_text(&state_for_recv, &user_for_recv, text.as_str()).await
                }
                Message::Close(frame) => {
                    tracing::info!("User '{}' closed the socket: {:?}", user_for_recv, frame);
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.unregister(&user_id, session_id).await;
}

async fn handle_client_text(state: &AppState, user_id: &str, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Ignoring frame from '{}': {}", user_id, e);
            return;
        }
    };

    match message {
        ClientMessage::Pong { .. } => tracing::debug!("Received pong from '{}'", user_id),
        ClientMessage::Echo { message, .. } => {
            let echo = ServerMessage::Echo {
                message,
                timestamp: current_rfc3339(),
            };
            state.push_to(user_id, &echo).await;
        }
        ClientMessage::DeviceCommand {
            device_id,
            control_id,
            command_type,
            value,
            ..
        } => {
            tracing::info!(
                "User '{}' sent {} {}.{} = {}",
                user_id,
                command_type,
                device_id,
                control_id,
                value
            );
            let now = current_rfc3339();
            state
                .push_to(
                    user_id,
                    &ServerMessage::CommandSent {
                        device_id: device_id.clone(),
                        control_id: control_id.clone(),
                        command_type,
                        value,
                        timestamp: now.clone(),
                    },
                )
                .await;

            let controls = state.apply_control(&device_id, &control_id, value, &now).await;
            state
                .push_to(
                    user_id,
                    &ServerMessage::ControlStatusUpdate {
                        device_id: device_id.clone(),
                        controls,
                        timestamp: now.clone(),
                    },
                )
                .await;
            state
                .push_to(
                    user_id,
                    &ServerMessage::CommandExecuted {
                        device_id,
                        control_id,
                        value,
                        success: true,
                        timestamp: now,
                    },
                )
                .await;
        }
    }
}
