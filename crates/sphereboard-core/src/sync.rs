//! Wire protocol and WebSocket client for the collaboration relay.
//!
//! Elements travel as raw JSON values so each receiver can decode them one at
//! a time and drop only the ones it does not understand.

use crate::elements::ElementId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Enter a board's broadcast group
    Join { board: String },
    /// Leave the current board
    Leave,
    ElementAdded { element: Value },
    ElementUpdated { element: Value },
    ElementRemoved { id: ElementId },
    BoardCleared,
    /// Pointer position as a fraction of the sender's viewport
    CursorPing {
        x: f64,
        y: f64,
        name: String,
        color: String,
    },
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Confirms a join
    Joined {
        board: String,
        peer_id: String,
        peer_count: usize,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    ElementAdded { from: String, element: Value },
    ElementUpdated { from: String, element: Value },
    ElementRemoved { from: String, id: ElementId },
    BoardCleared { from: String },
    /// Cursor ping stamped by the relay with sender and time (ms since epoch)
    CursorPing {
        from: String,
        x: f64,
        y: f64,
        name: String,
        color: String,
        t: u64,
    },
    /// Someone saved the board through the persistence API
    BoardSaved { by: String, at: u64 },
    Error { message: String },
}

impl ClientMessage {
    /// Message the relay forwards to the other members of the board, if any.
    ///
    /// Join and leave are handled by the relay itself.
    pub fn relay(self, from: &str, t: u64) -> Option<ServerMessage> {
        let from = from.to_string();
        let msg = match self {
            ClientMessage::Join { .. } | ClientMessage::Leave => return None,
            ClientMessage::ElementAdded { element } => ServerMessage::ElementAdded { from, element },
            ClientMessage::ElementUpdated { element } => {
                ServerMessage::ElementUpdated { from, element }
            }
            ClientMessage::ElementRemoved { id } => ServerMessage::ElementRemoved { from, id },
            ClientMessage::BoardCleared => ServerMessage::BoardCleared { from },
            ClientMessage::CursorPing { x, y, name, color } => ServerMessage::CursorPing {
                from,
                x,
                y,
                name,
                color,
                t,
            },
        };
        Some(msg)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// What the bridge did with an incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    JoinedBoard {
        board: String,
        peer_id: String,
        peer_count: usize,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    ElementAdded { from: String, id: ElementId },
    ElementUpdated { from: String, id: ElementId },
    ElementRemoved { from: String, id: ElementId },
    BoardCleared { from: String },
    CursorMoved { from: String },
    BoardSaved { by: String, at: u64 },
    Error { message: String },
}

/// Raw events from the socket thread.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    /// A text frame
    Message(String),
    Error(String),
}

/// WebSocket client errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(String),
}

mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Read timeout that keeps the socket thread responsive to outgoing frames.
    const READ_TIMEOUT: Duration = Duration::from_millis(50);
    const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

    enum WsCommand {
        Send(String),
        Close,
    }

    /// Relay connection backed by a background thread.
    ///
    /// The owner polls [`RelaySocket::poll_events`] once per frame.
    pub struct RelaySocket {
        state: ConnectionState,
        events: Vec<TransportEvent>,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<TransportEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl RelaySocket {
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a `ws://` or `wss://` relay.
        pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
            if self.cmd_tx.is_some() {
                return Err(SyncError::AlreadyConnected);
            }

            let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(SyncError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    parsed.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;
            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<TransportEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Queue a text frame.
        pub fn send(&self, msg: &str) -> Result<(), SyncError> {
            let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
            tx.send(WsCommand::Send(msg.to_string()))
                .map_err(|e| SyncError::Send(e.to_string()))
        }

        /// Drain pending events without blocking.
        pub fn poll_events(&mut self) -> Vec<TransportEvent> {
            if let Some(rx) = &self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        TransportEvent::Connected => self.state = ConnectionState::Connected,
                        TransportEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        TransportEvent::Error(_) => self.state = ConnectionState::Error,
                        TransportEvent::Message(_) => {}
                    }
                    self.events.push(event);
                }
            }
            std::mem::take(&mut self.events)
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for RelaySocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for RelaySocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

    fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<TransportEvent>) {
        log::info!("relay socket connecting to {}", url);
        let (mut socket, response) = match connect(url) {
            Ok(ok) => ok,
            Err(e) => {
                log::error!("relay connection failed: {}", e);
                let _ = event_tx.send(TransportEvent::Error(format!("connection failed: {}", e)));
                return;
            }
        };
        log::info!("relay connected, status: {}", response.status());
        let _ = event_tx.send(TransportEvent::Connected);

        match socket.get_mut() {
            tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
                let _ = tcp.set_read_timeout(Some(READ_TIMEOUT));
                let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
            }
            #[allow(unreachable_patterns)]
            _ => log::debug!("non-plain stream, relying on default timeouts"),
        }

        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("relay send error: {}", e);
                        break;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("relay close requested");
                    let _ = socket.close(None);
                    break;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match socket.read() {
                Ok(Message::Text(txt)) => {
                    let _ = event_tx.send(TransportEvent::Message(txt.to_string()));
                }
                Ok(Message::Ping(data)) => {
                    let _ = socket.send(Message::Pong(data));
                }
                Ok(Message::Close(_)) => {
                    log::info!("relay sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => {
                    log::error!("relay read error: {}", e);
                    break;
                }
            }
        }

        log::info!("relay socket thread exiting");
        let _ = event_tx.send(TransportEvent::Disconnected);
    }
}

pub use native_client::RelaySocket;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_tags() {
        let msg = ClientMessage::Join {
            board: "team".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({"type": "join", "board": "team"}));

        let msg = ClientMessage::BoardCleared;
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "board-cleared"})
        );
    }

    #[test]
    fn test_server_message_deserialize() {
        let raw = r#"{"type":"element-removed","from":"p1","id":"abc"}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            ServerMessage::ElementRemoved {
                from: "p1".into(),
                id: ElementId::from("abc"),
            }
        );
    }

    #[test]
    fn test_relay_stamps_sender() {
        let ping = ClientMessage::CursorPing {
            x: 0.5,
            y: 0.5,
            name: "ada".into(),
            color: "#fff".into(),
        };
        match ping.relay("p1", 42) {
            Some(ServerMessage::CursorPing { from, t, .. }) => {
                assert_eq!(from, "p1");
                assert_eq!(t, 42);
            }
            other => panic!("unexpected relay result: {:?}", other),
        }
        assert!(ClientMessage::Leave.relay("p1", 0).is_none());
    }

    #[test]
    fn test_relay_keeps_element_payload() {
        let element = json!({"type": "mystery", "id": "x"});
        let relayed = ClientMessage::ElementAdded {
            element: element.clone(),
        }
        .relay("p2", 0);
        assert_eq!(
            relayed,
            Some(ServerMessage::ElementAdded {
                from: "p2".into(),
                element,
            })
        );
    }

    #[test]
    fn test_socket_rejects_bad_urls() {
        let mut socket = RelaySocket::new();
        assert!(matches!(
            socket.connect("http://localhost:3030/ws"),
            Err(SyncError::InvalidUrl(_))
        ));
        assert!(matches!(socket.connect("not a url"), Err(SyncError::InvalidUrl(_))));
        assert!(matches!(socket.send("{}"), Err(SyncError::NotConnected)));
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }
}
