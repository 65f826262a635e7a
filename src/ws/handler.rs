//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::api::auth::CurrentUser;
use crate::app_state::AppState;

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
///
/// The caller is identified like any REST request. The bus receiver is
/// created before the upgrade completes, so events published after the
/// handshake response are never missed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let event_rx = state.event_bus.subscribe();
    tracing::debug!(user_id = %user.id, "ws connection opened");

    ws.on_upgrade(move |socket| run_connection(socket, event_rx, user.id))
}
