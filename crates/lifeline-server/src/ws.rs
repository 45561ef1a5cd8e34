//! `WebSocket` live channel.
//!
//! Clients connect to `GET /ws/live`. On connect they get one snapshot of
//! each collection, then every snapshot the dispatcher broadcasts, as
//! `{"type": ..., "data": [...]}` text frames. Anything the client sends
//! is ignored apart from pings.
//!
//! A client that falls behind skips the lagged snapshots and resumes from
//! the newest one.

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use lifeline_types::{EntityKind, LiveMessage};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a live `WebSocket` connection.
///
/// # Route
///
/// `GET /ws/live`
pub async fn ws_live(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Number of connected live observers.
///
/// # Route
///
/// `GET /ws/live/clients`
#[allow(clippy::unused_async)]
pub async fn live_clients(State(state): State<Arc<AppState>>) -> Json<Value> {
    let connections = state.dispatcher.hub().connection_count();
    Json(serde_json::json!({ "connections": connections }))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let hub = state.dispatcher.hub();
    let mut rx = hub.subscribe();
    info!(connections = hub.connection_count(), "Live client connected");

    for kind in [EntityKind::Units, EntityKind::Events, EntityKind::Cameras] {
        let data = match hub.snapshot(kind).await {
            Ok(data) => data,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Failed to build initial snapshot");
                continue;
            }
        };
        if !send(&mut socket, &LiveMessage { kind, data }).await {
            debug!("Live client disconnected during initial snapshot");
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if !send(&mut socket, &msg).await {
                            debug!("Live client disconnected (send failed)");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Live client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Live channel closed");
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("Live socket error: {e}");
                        break;
                    }
                    // Keepalive text and anything else.
                    _ => {}
                }
            }
        }
    }

    drop(rx);
    info!(connections = hub.connection_count(), "Live client disconnected");
}

/// Send one snapshot as a text frame. Returns `false` once the client is gone.
async fn send(socket: &mut WebSocket, msg: &LiveMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            warn!(kind = %msg.kind, error = %e, "Failed to serialize live message");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
