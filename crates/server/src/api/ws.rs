//! WebSocket stream of session events for live slider updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use timeshift_core::SessionEvent;

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WsMessage {
    /// A session event, tagged by its own `type`.
    Session(SessionEvent),
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat(Heartbeat),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "heartbeat")]
pub struct Heartbeat {
    pub timestamp: i64,
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            WsMessage::Session(SessionEvent::BatchStarted { .. }) => "batch_started",
            WsMessage::Session(SessionEvent::TaskUpdated { .. }) => "task_updated",
            WsMessage::Session(SessionEvent::BatchSettled { .. }) => "batch_settled",
            WsMessage::Session(SessionEvent::BatchReset { .. }) => "batch_reset",
            WsMessage::Heartbeat(_) => "heartbeat",
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Snapshot plus stream covers every change exactly once
    let (mut rx, snapshot) = state.session().subscribe_with_snapshot().await;

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        // Late joiners start from the current batch
        if let Some(batch) = snapshot {
            let msg = WsMessage::Session(SessionEvent::BatchStarted { batch });
            if send_message(&mut sender, &msg).await.is_err() {
                return;
            }
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            let msg = tokio::select! {
                result = rx.recv() => match result {
                    Ok(event) => WsMessage::Session(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} events", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Session event channel closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => WsMessage::Heartbeat(Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                }),
            };

            if send_message(&mut sender, &msg).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring client message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

/// Serialize and send one message. Errs only when the client is gone.
async fn send_message<S>(sender: &mut S, msg: &WsMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            // Not the client's fault; keep the connection
            error!("Failed to serialize WsMessage: {}", e);
            return Ok(());
        }
    };

    WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();
    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
