//! HTTP routes: the WebSocket relay and the board persistence API.

use crate::error::ServerError;
use crate::rooms::{AppState, Envelope, SERVER_SENDER, now_millis};
use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sphereboard_core::storage::BoardSnapshot;
use sphereboard_core::sync::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Body of a board save. Elements are decoded one by one; bad ones are skipped.
#[derive(Debug, Default, Deserialize)]
pub struct SaveBoardRequest {
    #[serde(default)]
    pub elements: Vec<Value>,
    /// Who saved, echoed in the room notice
    #[serde(default)]
    pub by: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SaveBoardResponse {
    pub ok: bool,
    pub saved: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/boards/{id}", get(get_board).post(save_board))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Sphereboard relay server - connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

fn check_board_id(id: &str) -> Result<(), ServerError> {
    if id.trim().is_empty() || id.len() > 128 {
        return Err(ServerError::InvalidBoardId(id.to_string()));
    }
    Ok(())
}

/// Load a board, creating it empty on first access.
pub async fn get_board(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<BoardSnapshot>, ServerError> {
    check_board_id(&id)?;
    let snapshot = state.load_board(&id).await?;
    debug!("board {} loaded with {} elements", id, snapshot.elements.len());
    Ok(Json(snapshot))
}

/// Replace a board's elements and tell the room about it.
pub async fn save_board(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveBoardRequest>,
) -> Result<Json<SaveBoardResponse>, ServerError> {
    check_board_id(&id)?;
    let snapshot = state
        .save_board(&id, BoardSnapshot::from_values(body.elements))
        .await?;
    info!("board {} saved with {} elements", id, snapshot.elements.len());

    let notice = ServerMessage::BoardSaved {
        by: body.by.unwrap_or_else(|| "anonymous".to_string()),
        at: now_millis(),
    };
    state.broadcast(&id, SERVER_SENDER, notice);

    Ok(Json(SaveBoardResponse {
        ok: true,
        saved: snapshot.elements.len(),
    }))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("failed to encode {:?}: {}", msg, e);
            None
        }
    }
}

/// Leave the current board, if any, and tell the rest of the room.
fn leave_current(state: &AppState, current: &mut Option<String>, peer_id: &str) {
    if let Some(board) = current.take() {
        state.leave_room(&board, peer_id);
        state.broadcast(
            &board,
            peer_id,
            ServerMessage::PeerLeft {
                peer_id: peer_id.to_string(),
            },
        );
        info!("Peer {} left board {}", peer_id, board);
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_board: Option<String> = None;
    let mut room_rx: Option<broadcast::Receiver<Envelope>> = None;

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(m) => m,
                            Err(e) => {
                                warn!("Invalid message from {}: {}", peer_id, e);
                                let err = ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                };
                                if let Some(frame) = encode(&err) {
                                    let _ = sender.send(frame).await;
                                }
                                continue;
                            }
                        };
                        match client_msg {
                            ClientMessage::Join { board } => {
                                if current_board.as_deref() == Some(board.as_str()) {
                                    continue;
                                }
                                leave_current(&state, &mut current_board, &peer_id);

                                let (rx, peer_count) = state.join_room(&board, &peer_id);
                                room_rx = Some(rx);
                                current_board = Some(board.clone());

                                let joined = ServerMessage::Joined {
                                    board: board.clone(),
                                    peer_id: peer_id.clone(),
                                    peer_count,
                                };
                                if let Some(frame) = encode(&joined) {
                                    if sender.send(frame).await.is_err() {
                                        break;
                                    }
                                }

                                state.broadcast(&board, &peer_id, ServerMessage::PeerJoined {
                                    peer_id: peer_id.clone(),
                                });
                                info!("Peer {} joined board {}", peer_id, board);
                            }
                            ClientMessage::Leave => {
                                leave_current(&state, &mut current_board, &peer_id);
                                room_rx = None;
                            }
                            other => {
                                let Some(board) = current_board.as_deref() else {
                                    debug!("Dropping message from {} outside any board", peer_id);
                                    continue;
                                };
                                if let Some(relayed) = other.relay(&peer_id, now_millis()) {
                                    state.broadcast(board, &peer_id, relayed);
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            // Handle broadcast messages from the room
            msg = async {
                match &mut room_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    Some(Ok((from, server_msg))) => {
                        // Don't echo back to sender
                        if from != peer_id {
                            if let Some(frame) = encode(&server_msg) {
                                if sender.send(frame).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        warn!("Peer {} lagged, {} messages dropped", peer_id, skipped);
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) | None => {
                        room_rx = None;
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    leave_current(&state, &mut current_board, &peer_id);
    info!("Connection closed: {}", peer_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sphereboard_core::storage::MemoryStorage;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Box::new(MemoryStorage::new())))
    }

    #[tokio::test]
    async fn test_get_board_creates_empty() {
        let state = state();
        let Json(board) = get_board(Path("team".into()), State(state.clone()))
            .await
            .unwrap();
        assert!(board.elements.is_empty());
        assert!(state.storage.exists("team").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_then_get_round_trip() {
        let state = state();
        let body = SaveBoardRequest {
            elements: vec![
                json!({"type": "rect", "id": "r1", "x": 0, "y": 0, "w": 100, "h": 100, "color": "#2563eb"}),
                json!({"type": "hologram", "id": "h1"}),
            ],
            by: Some("ada".into()),
        };
        let Json(resp) = save_board(Path("team".into()), State(state.clone()), Json(body))
            .await
            .unwrap();
        assert_eq!(resp, SaveBoardResponse { ok: true, saved: 1 });

        let Json(board) = get_board(Path("team".into()), State(state))
            .await
            .unwrap();
        assert_eq!(board.elements.len(), 1);
        assert_eq!(board.elements[0].id().as_str(), "r1");
    }

    #[tokio::test]
    async fn test_save_notifies_room() {
        let state = state();
        let (mut rx, _) = state.join_room("team", "peer-1");
        let body = SaveBoardRequest {
            elements: Vec::new(),
            by: Some("ada".into()),
        };
        save_board(Path("team".into()), State(state.clone()), Json(body))
            .await
            .unwrap();

        let (from, msg) = rx.recv().await.unwrap();
        assert_eq!(from, SERVER_SENDER);
        match msg {
            ServerMessage::BoardSaved { by, at } => {
                assert_eq!(by, "ada");
                assert!(at > 0);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_board_id_rejected() {
        let result = get_board(Path("  ".into()), State(state())).await;
        assert!(matches!(result, Err(ServerError::InvalidBoardId(_))));
    }

    #[test]
    fn test_leave_current_notifies_others() {
        let state = state();
        let (mut rx, _) = state.join_room("team", "observer");
        let _ = state.join_room("team", "leaver");
        let mut current = Some("team".to_string());

        leave_current(&state, &mut current, "leaver");
        assert!(current.is_none());
        assert_eq!(state.peer_count("team"), 1);
        let (from, msg) = rx.try_recv().unwrap();
        assert_eq!(from, "leaver");
        assert_eq!(
            msg,
            ServerMessage::PeerLeft {
                peer_id: "leaver".into()
            }
        );
    }
}
