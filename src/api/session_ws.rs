//! WebSocket session channel / WebSocket 会话通道
//!
//! The launcher frontend streams keystrokes in and receives display models
//! and notifications back. Debounce and the stale guard live in the session,
//! not here — this layer only moves events. / 前端输入流入，展示模型与通知
//! 流出；防抖与代际守卫都在会话内部，这里只搬运事件。

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use weisou_backend::models::{DisplayModel, Notification};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientEvent {
    /// One keystroke's worth of input / 一次输入
    Input { text: String },
    /// Open a conversation / 打开会话
    Chat { id: String },
    /// Pin or unpin / 置顶或取消
    TogglePin { id: String },
    /// Clear the recency log / 清除历史
    ClearRecent,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerEvent<'a> {
    Display { model: &'a DisplayModel },
    Notification { notification: &'a Notification },
}

/// GET /api/session/ws - 会话通道
pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    tracing::info!("Session connected: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let mut display_rx = state.session.subscribe_display();
    let mut notify_rx = state.session.subscribe_notifications();

    // 连接即下发当前展示 / push the current display on connect
    {
        let model = display_rx.borrow_and_update().clone();
        if send_event(&mut sender, &ServerEvent::Display { model: &model })
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_event(&state, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong/binary 忽略
                    Some(Err(e)) => {
                        tracing::debug!("Session {} receive error: {}", connection_id, e);
                        break;
                    }
                }
            }
            changed = display_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let model = display_rx.borrow_and_update().clone();
                if send_event(&mut sender, &ServerEvent::Display { model: &model })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            notification = notify_rx.recv() => {
                match notification {
                    Ok(n) => {
                        if send_event(&mut sender, &ServerEvent::Notification { notification: &n })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Session {} dropped {} notifications", connection_id, skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!("Session disconnected: {}", connection_id);
}

async fn handle_client_event(state: &Arc<AppState>, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Undecodable client event: {}", e);
            return;
        }
    };

    match event {
        ClientEvent::Input { text } => {
            state.session.submit_input(&text);
        }
        ClientEvent::Chat { id } => {
            if let Some(contact) = state.session.find_contact(&id) {
                if let Err(e) = state.session.launch_chat(&contact).await {
                    tracing::warn!("Chat launch failed: {}", e);
                }
            }
        }
        ClientEvent::TogglePin { id } => {
            let contact = state
                .session
                .find_contact(&id)
                .or_else(|| state.session.pinned().into_iter().find(|c| c.id == id));
            if let Some(contact) = contact {
                state.session.toggle_pin(&contact).await;
            }
        }
        ClientEvent::ClearRecent => {
            state.session.clear_recent().await;
        }
    }
}

async fn send_event(
    sender: &mut (impl SinkExt<Message> + Unpin),
    event: &ServerEvent<'_>,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to encode server event: {}", e);
            return Err(());
        }
    };
    sender.send(Message::Text(payload)).await.map_err(|_| ())
}
