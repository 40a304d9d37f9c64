use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::service;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FeedParams {
    /// Browsers cannot set headers on a websocket upgrade, so the bearer
    /// token travels as a query parameter here.
    token: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<FeedParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let viewer = match state.sessions.resolve(&params.token) {
        Some(user) => user,
        None => {
            return AppError::AuthFailed("invalid or expired token".to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, viewer.user_id))
}

/// One snapshot message, then one message per in-scope change. The feed is
/// bound to the viewer's visibility at connect time; a client whose role or
/// pincode changes reconnects for a fresh scope.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, viewer_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (snapshot, mut feed) = service::resolve_visible_pickups(&state, viewer_id);

    info!(%viewer_id, "pickup feed connected");

    let snapshot_msg = json!({ "type": "snapshot", "pickups": snapshot }).to_string();
    if sender.send(Message::Text(snapshot_msg)).await.is_err() {
        return;
    }

    let send_task = tokio::spawn(async move {
        while let Some(change) = feed.next().await {
            let text = json!({ "type": "change", "pickup": change.after }).to_string();
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(%viewer_id, "pickup feed disconnected");
}
