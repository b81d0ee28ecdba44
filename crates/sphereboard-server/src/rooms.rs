//! Shared relay state: one broadcast group per board.

use crate::error::ServerError;
use dashmap::DashMap;
use sphereboard_core::storage::{BoardSnapshot, BoardStorage};
use sphereboard_core::sync::ServerMessage;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Sender id used for messages that originate from the server itself.
pub const SERVER_SENDER: &str = "";

/// A relayed message and the peer that caused it.
pub type Envelope = (String, ServerMessage);

/// Board room state
struct Room {
    /// Broadcast channel for this board
    tx: broadcast::Sender<Envelope>,
    /// Connected peer IDs
    peers: HashSet<String>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Boards with at least one connected peer
    rooms: DashMap<String, Room>,
    pub storage: Box<dyn BoardStorage>,
}

impl AppState {
    pub fn new(storage: Box<dyn BoardStorage>) -> Self {
        Self {
            rooms: DashMap::new(),
            storage,
        }
    }

    /// Add peer to a board's room. Returns the subscription and the peer count.
    pub fn join_room(&self, board: &str, peer_id: &str) -> (broadcast::Receiver<Envelope>, usize) {
        let mut room = self.rooms.entry(board.to_string()).or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        (room.tx.subscribe(), room.peers.len())
    }

    /// Remove peer from a room, dropping the room once empty.
    pub fn leave_room(&self, board: &str, peer_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(board) {
            room.peers.remove(peer_id);
            if room.peers.is_empty() {
                drop(room);
                self.rooms.remove(board);
            }
        }
    }

    /// Broadcast message to a room. Returns false when nobody is in it.
    pub fn broadcast(&self, board: &str, from: &str, msg: ServerMessage) -> bool {
        match self.rooms.get(board) {
            Some(room) => room.tx.send((from.to_string(), msg)).is_ok(),
            None => false,
        }
    }

    pub fn peer_count(&self, board: &str) -> usize {
        self.rooms.get(board).map(|r| r.peers.len()).unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Load a board on the blocking pool, creating it empty on first access.
    pub async fn load_board(self: &Arc<Self>, id: &str) -> Result<BoardSnapshot, ServerError> {
        let state = Arc::clone(self);
        let id = id.to_string();
        let snapshot = tokio::task::spawn_blocking(move || {
            pollster::block_on(state.storage.load_or_create(&id))
        })
        .await??;
        Ok(snapshot)
    }

    /// Replace a board's stored snapshot on the blocking pool.
    pub async fn save_board(
        self: &Arc<Self>,
        id: &str,
        snapshot: BoardSnapshot,
    ) -> Result<BoardSnapshot, ServerError> {
        let state = Arc::clone(self);
        let id = id.to_string();
        let saved = tokio::task::spawn_blocking(move || {
            pollster::block_on(state.storage.save(&id, &snapshot)).map(|()| snapshot)
        })
        .await??;
        Ok(saved)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
