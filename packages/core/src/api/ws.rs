//! Observer join endpoint.
//!
//! `GET /ws` upgrades to a WebSocket, registers a delivery channel with
//! the connection registry, and forwards broadcasts until the client
//! disconnects or a send fails. Inbound frames are keep-alive traffic
//! and are ignored except for Close.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tokio::sync::mpsc;

use super::AppState;

/// Per-observer outbound queue depth. A client that falls this far
/// behind starts hitting the registry's send timeout and is dropped.
const OBSERVER_QUEUE_DEPTH: usize = 64;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<String>(OBSERVER_QUEUE_DEPTH);
    let id = state.registry.register(tx).await;
    state.metrics.observers_connected.inc();

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                // Channel closed: the registry dropped us (send failure
                // on another broadcast, or disconnect_all).
                None => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.registry.unregister(id).await;
    state.metrics.observers_connected.dec();
}
