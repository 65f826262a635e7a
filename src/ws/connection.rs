//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! answering client commands and forwarding the user's events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{CareEvent, UserId};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and answers them.
/// - Forwards events addressed to `user_id` from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<CareEvent>,
    user_id: UserId,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new(user_id);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(care_event) => {
                        if !subs.matches(&care_event) {
                            continue;
                        }
                        let Some(json) = event_json(&care_event) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(%user_id, lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(%user_id, "ws connection closed");
}

fn event_json(event: &CareEvent) -> Option<String> {
    let payload = match serde_json::to_value(event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, event_type = event.event_type_str(), "event serialization failed");
            return None;
        }
    };
    let msg = WsMessage::new(uuid::Uuid::new_v4().to_string(), WsMessageType::Event, payload);
    serde_json::to_string(&msg).ok()
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error(String::new(), 400, "malformed JSON")).ok();
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return serde_json::to_string(&WsMessage::error(msg.id, 404, "unknown command")).ok();
    };

    let payload = match command {
        WsCommand::Subscribe { event_types } => serde_json::json!({
            "subscribed": subs.subscribe(&event_types),
            "active": subs.active(),
        }),
        WsCommand::Unsubscribe { event_types } => serde_json::json!({
            "unsubscribed": subs.unsubscribe(&event_types),
            "active": subs.active(),
        }),
        WsCommand::Ping => serde_json::json!({ "pong": true }),
    };
    serde_json::to_string(&WsMessage::new(msg.id, WsMessageType::Response, payload)).ok()
}
