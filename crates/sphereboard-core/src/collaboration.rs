//! Collaboration bridge between the local scene and the relay.
//!
//! Outgoing messages are queued as JSON strings for the transport to drain.
//! Incoming messages are applied straight to the [`Scene`]; concurrent edits to
//! the same id resolve as last-write-wins.

use crate::controller::SceneChange;
use crate::elements::Element;
use crate::presence::{CursorTable, RemoteCursor};
use crate::scene::Scene;
use crate::sync::{ClientMessage, ServerMessage, SyncEvent};
use std::time::Instant;

/// Local pointer as last reported, normalized to the viewport.
#[derive(Debug, Clone, PartialEq)]
struct CursorPing {
    x: f64,
    y: f64,
}

/// Mirrors committed scene changes to the board's other participants.
#[derive(Debug)]
pub struct CollaborationBridge {
    /// Board we joined or asked to join.
    current_board: Option<String>,
    /// Our id as assigned by the relay.
    peer_id: Option<String>,
    name: String,
    color: String,
    /// Latest unsent cursor position; at most one ping goes out per frame.
    pending_cursor: Option<CursorPing>,
    cursors: CursorTable,
    outgoing: Vec<String>,
}

impl CollaborationBridge {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            current_board: None,
            peer_id: None,
            name: name.into(),
            color: color.into(),
            pending_cursor: None,
            cursors: CursorTable::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn current_board(&self) -> Option<&str> {
        self.current_board.as_deref()
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn cursors(&self) -> &CursorTable {
        &self.cursors
    }

    /// Join a board's broadcast group.
    pub fn join(&mut self, board: &str) {
        if self.current_board.as_deref() == Some(board) {
            return;
        }
        if self.current_board.is_some() {
            self.leave();
        }
        self.current_board = Some(board.to_string());
        self.queue(&ClientMessage::Join {
            board: board.to_string(),
        });
    }

    pub fn leave(&mut self) {
        if self.current_board.take().is_some() {
            self.queue(&ClientMessage::Leave);
            self.cursors.clear();
            self.pending_cursor = None;
        }
    }

    /// Queue the message for a committed local change.
    pub fn broadcast(&mut self, change: &SceneChange) {
        if self.current_board.is_none() {
            return;
        }
        let msg = match change {
            SceneChange::Added(element) => ClientMessage::ElementAdded {
                element: element.to_value(),
            },
            SceneChange::Updated(element) => ClientMessage::ElementUpdated {
                element: element.to_value(),
            },
            SceneChange::Removed(id) => ClientMessage::ElementRemoved { id: id.clone() },
            SceneChange::Cleared => ClientMessage::BoardCleared,
        };
        self.queue(&msg);
    }

    /// Record the local pointer; sent on the next [`CollaborationBridge::flush_frame`].
    pub fn queue_cursor(&mut self, x: f64, y: f64) {
        self.pending_cursor = Some(CursorPing { x, y });
    }

    /// Emit the pending cursor ping, if any. Call once per frame.
    pub fn flush_frame(&mut self) {
        let Some(ping) = self.pending_cursor.take() else {
            return;
        };
        if self.current_board.is_none() {
            return;
        }
        self.queue(&ClientMessage::CursorPing {
            x: ping.x,
            y: ping.y,
            name: self.name.clone(),
            color: self.color.clone(),
        });
    }

    /// Drain queued outgoing messages.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Drop remote cursors that have gone quiet.
    pub fn purge_cursors(&mut self, now: Instant) -> usize {
        self.cursors.purge(now)
    }

    fn queue(&mut self, msg: &ClientMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::warn!("failed to encode outgoing message: {}", e),
        }
    }

    /// Apply an incoming relay message to `scene`.
    ///
    /// Returns `None` for messages that were malformed or carried an element
    /// this client cannot decode.
    pub fn handle_message(&mut self, json: &str, scene: &mut Scene, now: Instant) -> Option<SyncEvent> {
        let msg: ServerMessage = match serde_json::from_str(json) {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("dropping malformed relay message: {}", e);
                return None;
            }
        };

        match msg {
            ServerMessage::Joined {
                board,
                peer_id,
                peer_count,
            } => {
                self.current_board = Some(board.clone());
                self.peer_id = Some(peer_id.clone());
                Some(SyncEvent::JoinedBoard {
                    board,
                    peer_id,
                    peer_count,
                })
            }
            ServerMessage::PeerJoined { peer_id } => Some(SyncEvent::PeerJoined { peer_id }),
            ServerMessage::PeerLeft { peer_id } => {
                self.cursors.remove(&peer_id);
                Some(SyncEvent::PeerLeft { peer_id })
            }
            ServerMessage::ElementAdded { from, element } => {
                let element = decode_element(element)?;
                let id = element.id().clone();
                scene.append(element);
                Some(SyncEvent::ElementAdded { from, id })
            }
            ServerMessage::ElementUpdated { from, element } => {
                let element = decode_element(element)?;
                let id = element.id().clone();
                if scene.replace(element).is_none() {
                    log::debug!("update for unknown element {} ignored", id);
                    return None;
                }
                Some(SyncEvent::ElementUpdated { from, id })
            }
            ServerMessage::ElementRemoved { from, id } => {
                scene.remove(&id);
                Some(SyncEvent::ElementRemoved { from, id })
            }
            ServerMessage::BoardCleared { from } => {
                scene.clear();
                Some(SyncEvent::BoardCleared { from })
            }
            ServerMessage::CursorPing {
                from,
                x,
                y,
                name,
                color,
                ..
            } => {
                self.cursors.upsert(RemoteCursor {
                    participant_id: from.clone(),
                    x,
                    y,
                    name,
                    color,
                    received: now,
                });
                Some(SyncEvent::CursorMoved { from })
            }
            ServerMessage::BoardSaved { by, at } => Some(SyncEvent::BoardSaved { by, at }),
            ServerMessage::Error { message } => {
                log::warn!("relay error: {}", message);
                Some(SyncEvent::Error { message })
            }
        }
    }
}

fn decode_element(value: serde_json::Value) -> Option<Element> {
    match Element::from_value(value) {
        Ok(element) => Some(element),
        Err(e) => {
            log::warn!("ignoring remote element: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{BoxShape, ElementId};
    use serde_json::json;
    use std::time::Duration;

    fn joined_bridge() -> CollaborationBridge {
        let mut bridge = CollaborationBridge::new("ada@example.com", "hsl(1 85% 55%)");
        bridge.join("team");
        bridge.take_outgoing();
        bridge
    }

    fn relay(msg: ClientMessage, from: &str) -> String {
        serde_json::to_string(&msg.relay(from, 0).unwrap()).unwrap()
    }

    #[test]
    fn test_join_and_leave_queue_messages() {
        let mut bridge = CollaborationBridge::new("ada", "#000");
        bridge.join("team");
        bridge.join("team");
        bridge.leave();
        let out = bridge.take_outgoing();
        assert_eq!(out.len(), 2);
        assert!(out[0].contains("\"join\""));
        assert!(out[1].contains("\"leave\""));
        assert!(bridge.current_board().is_none());
    }

    #[test]
    fn test_nothing_broadcast_outside_a_board() {
        let mut bridge = CollaborationBridge::new("ada", "#000");
        bridge.broadcast(&SceneChange::Cleared);
        bridge.queue_cursor(0.1, 0.1);
        bridge.flush_frame();
        assert!(!bridge.has_outgoing());
    }

    #[test]
    fn test_added_rect_reaches_peer_exactly() {
        let mut alice = joined_bridge();
        let mut bob = joined_bridge();
        let mut bob_scene = Scene::new();

        let rect = Element::Rect(BoxShape::new(0.0, 0.0, 100.0, 100.0, "#2563eb"));
        alice.broadcast(&SceneChange::Added(rect.clone()));
        let out = alice.take_outgoing();
        assert_eq!(out.len(), 1);

        let sent: ClientMessage = serde_json::from_str(&out[0]).unwrap();
        let event = bob.handle_message(&relay(sent, "alice"), &mut bob_scene, Instant::now());
        assert!(matches!(event, Some(SyncEvent::ElementAdded { .. })));
        assert_eq!(bob_scene.all(), vec![rect]);
    }

    #[test]
    fn test_unknown_element_type_is_dropped() {
        let mut bridge = joined_bridge();
        let mut scene = Scene::new();
        let msg = relay(
            ClientMessage::ElementAdded {
                element: json!({"type": "hologram", "id": "h1"}),
            },
            "p",
        );
        assert!(bridge.handle_message(&msg, &mut scene, Instant::now()).is_none());
        assert!(bridge.handle_message("{not json", &mut scene, Instant::now()).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_update_remove_clear() {
        let mut bridge = joined_bridge();
        let rect = BoxShape::new(0.0, 0.0, 100.0, 100.0, "#2563eb");
        let id = rect.id.clone();
        let mut scene = Scene::from_elements([Element::Rect(rect.clone())]);
        let now = Instant::now();

        let mut moved = rect;
        moved.x = 50.0;
        let msg = relay(
            ClientMessage::ElementUpdated {
                element: Element::Rect(moved.clone()).to_value(),
            },
            "p",
        );
        bridge.handle_message(&msg, &mut scene, now);
        assert_eq!(scene.get(&id), Some(&Element::Rect(moved)));

        let msg = relay(ClientMessage::ElementRemoved { id: id.clone() }, "p");
        bridge.handle_message(&msg, &mut scene, now);
        assert!(scene.is_empty());

        scene.append(Element::Rect(BoxShape::new(1.0, 1.0, 5.0, 5.0, "#000")));
        let msg = relay(ClientMessage::BoardCleared, "p");
        assert_eq!(
            bridge.handle_message(&msg, &mut scene, now),
            Some(SyncEvent::BoardCleared { from: "p".into() })
        );
        assert!(scene.is_empty());
    }

    #[test]
    fn test_update_for_unknown_id_is_ignored() {
        let mut bridge = joined_bridge();
        let mut scene = Scene::new();
        let msg = relay(
            ClientMessage::ElementUpdated {
                element: Element::Rect(BoxShape::new(0.0, 0.0, 1.0, 1.0, "#000")).to_value(),
            },
            "p",
        );
        assert!(bridge.handle_message(&msg, &mut scene, Instant::now()).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_cursor_ping_throttled_to_latest() {
        let mut bridge = joined_bridge();
        bridge.queue_cursor(0.1, 0.2);
        bridge.queue_cursor(0.3, 0.4);
        bridge.flush_frame();
        bridge.flush_frame();
        let out = bridge.take_outgoing();
        assert_eq!(out.len(), 1);
        let sent: ClientMessage = serde_json::from_str(&out[0]).unwrap();
        assert_eq!(
            sent,
            ClientMessage::CursorPing {
                x: 0.3,
                y: 0.4,
                name: "ada@example.com".into(),
                color: "hsl(1 85% 55%)".into(),
            }
        );
    }

    #[test]
    fn test_remote_cursor_expires() {
        let mut bridge = joined_bridge();
        let mut scene = Scene::new();
        let t0 = Instant::now();
        let ping = relay(
            ClientMessage::CursorPing {
                x: 0.5,
                y: 0.5,
                name: "bob".into(),
                color: "#f00".into(),
            },
            "bob-peer",
        );
        bridge.handle_message(&ping, &mut scene, t0);
        assert_eq!(bridge.cursors().live(t0).len(), 1);
        bridge.purge_cursors(t0 + Duration::from_millis(5000));
        assert!(bridge.cursors().live(t0 + Duration::from_millis(5000)).is_empty());
    }

    #[test]
    fn test_joined_records_peer_id() {
        let mut bridge = joined_bridge();
        let mut scene = Scene::new();
        let msg = serde_json::to_string(&ServerMessage::Joined {
            board: "team".into(),
            peer_id: "me".into(),
            peer_count: 2,
        })
        .unwrap();
        bridge.handle_message(&msg, &mut scene, Instant::now());
        assert_eq!(bridge.peer_id(), Some("me"));
        let removed = ElementId::from("gone");
        let msg = relay(ClientMessage::ElementRemoved { id: removed }, "p");
        assert!(bridge.handle_message(&msg, &mut scene, Instant::now()).is_some());
    }
}
