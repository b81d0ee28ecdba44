//! One participant's view of one board.
//!
//! [`BoardSession`] owns the local scene and wires the interaction controller
//! to the collaboration bridge: every committed change is applied locally and
//! queued for broadcast in the same call.

use crate::camera::{Camera, ZOOM_OUT_STEP, ZOOM_STEP};
use crate::collaboration::CollaborationBridge;
use crate::color::participant_color;
use crate::controller::{InteractionController, SceneChange};
use crate::input::{Key, Modifiers, PointerEvent};
use crate::scene::Scene;
use crate::storage::{BoardSnapshot, BoardStorage};
use crate::sync::{RelaySocket, SyncError, SyncEvent, TransportEvent};
use crate::tools::ToolSettings;
use kurbo::Size;
use std::time::Instant;

/// Default relay endpoint.
pub const DEFAULT_RELAY_URL: &str = "ws://localhost:3030/ws";

/// Per-participant settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Name shown on this participant's cursor.
    pub display_name: String,
    /// Seed for the participant color.
    pub color_seed: u64,
    pub relay_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_name: "guest".to_string(),
            color_seed: uuid::Uuid::new_v4().as_u64_pair().0,
            relay_url: DEFAULT_RELAY_URL.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn color(&self) -> String {
        participant_color(self.color_seed)
    }
}

/// Outcome of the last explicit save, for the embedding UI to show.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveNotice {
    Saved,
    Failed(String),
}

/// Local state of a board being edited.
pub struct BoardSession {
    board_id: String,
    relay_url: String,
    scene: Scene,
    camera: Camera,
    controller: InteractionController,
    bridge: CollaborationBridge,
    tools: ToolSettings,
    viewport: Size,
    notice: Option<SaveNotice>,
}

impl BoardSession {
    /// Start an empty session and join the board's broadcast group.
    pub fn new(board_id: impl Into<String>, config: &SessionConfig) -> Self {
        let board_id = board_id.into();
        let mut bridge = CollaborationBridge::new(config.display_name.clone(), config.color());
        bridge.join(&board_id);
        Self {
            board_id,
            relay_url: config.relay_url.clone(),
            scene: Scene::new(),
            camera: Camera::new(),
            controller: InteractionController::new(),
            bridge,
            tools: ToolSettings::new(),
            viewport: Size::new(1280.0, 800.0),
            notice: None,
        }
    }

    /// Open a board from storage. A failed load starts an empty board.
    pub async fn open(
        board_id: impl Into<String>,
        config: &SessionConfig,
        storage: &dyn BoardStorage,
    ) -> Self {
        let mut session = Self::new(board_id, config);
        match storage.load_or_create(&session.board_id).await {
            Ok(snapshot) => {
                log::info!(
                    "loaded board {} with {} elements",
                    session.board_id,
                    snapshot.elements.len()
                );
                session.scene.load(snapshot.elements);
            }
            Err(e) => log::warn!("failed to load board {}, starting empty: {}", session.board_id, e),
        }
        session
    }

    /// Save the full element list. Failure only sets a notice.
    pub async fn save(&mut self, storage: &dyn BoardStorage) -> bool {
        let snapshot = BoardSnapshot::new(self.scene.all());
        match storage.save(&self.board_id, &snapshot).await {
            Ok(()) => {
                self.notice = Some(SaveNotice::Saved);
                true
            }
            Err(e) => {
                log::warn!("failed to save board {}: {}", self.board_id, e);
                self.notice = Some(SaveNotice::Failed(e.to_string()));
                false
            }
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn bridge(&self) -> &CollaborationBridge {
        &self.bridge
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolSettings {
        &mut self.tools
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn notice(&self) -> Option<&SaveNotice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<SaveNotice> {
        self.notice.take()
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.controller.set_modifiers(modifiers);
    }

    /// Feed a pointer event (screen coordinates).
    pub fn handle_pointer(&mut self, event: &PointerEvent, now: Instant) -> Vec<SceneChange> {
        let changes = self.controller.handle_pointer(
            event,
            now,
            &mut self.scene,
            &mut self.camera,
            &self.tools,
        );
        if let PointerEvent::Move { position } = event {
            if self.viewport.width > 0.0 && self.viewport.height > 0.0 {
                self.bridge.queue_cursor(
                    position.x / self.viewport.width,
                    position.y / self.viewport.height,
                );
            }
        }
        self.publish(changes)
    }

    pub fn handle_key(&mut self, key: &Key) -> Vec<SceneChange> {
        let changes = self.controller.handle_key(key, &mut self.scene);
        self.publish(changes)
    }

    pub fn clear_board(&mut self) -> Vec<SceneChange> {
        let changes = self.controller.clear_board(&mut self.scene);
        self.publish(changes)
    }

    pub fn delete_selected(&mut self) -> Vec<SceneChange> {
        let changes = self.controller.delete_selected(&mut self.scene);
        self.publish(changes)
    }

    pub fn zoom_in(&mut self) {
        self.camera.zoom_center(self.viewport, ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_center(self.viewport, ZOOM_OUT_STEP);
    }

    pub fn fit(&mut self) {
        self.camera.fit();
    }

    /// Apply a message from the relay.
    pub fn handle_remote(&mut self, json: &str, now: Instant) -> Option<SyncEvent> {
        let event = self.bridge.handle_message(json, &mut self.scene, now);
        if event.is_some() {
            self.controller.reconcile(&self.scene);
        }
        event
    }

    /// Per-frame housekeeping. Returns true while the camera is still easing.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.bridge.purge_cursors(now);
        self.bridge.flush_frame();
        self.camera.tick()
    }

    /// Open a socket to the configured relay.
    pub fn connect(&self) -> Result<RelaySocket, SyncError> {
        let mut socket = RelaySocket::new();
        socket.connect(&self.relay_url)?;
        Ok(socket)
    }

    /// Exchange pending messages with the relay. Returns the applied events.
    ///
    /// Sends that fail are dropped, not retried.
    pub fn pump(&mut self, socket: &mut RelaySocket, now: Instant) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        for event in socket.poll_events() {
            match event {
                TransportEvent::Message(json) => events.extend(self.handle_remote(&json, now)),
                TransportEvent::Connected => log::info!("relay connected for {}", self.board_id),
                TransportEvent::Disconnected => log::info!("relay disconnected"),
                TransportEvent::Error(message) => {
                    log::warn!("relay error: {}", message);
                    events.push(SyncEvent::Error { message });
                }
            }
        }
        for json in self.take_outgoing() {
            if let Err(e) = socket.send(&json) {
                log::debug!("dropping outgoing message: {}", e);
            }
        }
        events
    }

    /// Leave the board's broadcast group.
    pub fn leave(&mut self) {
        self.bridge.leave();
    }

    /// Drain messages for the transport.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.bridge.take_outgoing()
    }

    fn publish(&mut self, changes: Vec<SceneChange>) -> Vec<SceneChange> {
        for change in &changes {
            self.bridge.broadcast(change);
        }
        changes
    }
}
