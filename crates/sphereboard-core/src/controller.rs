//! Interaction controller: turns pointer and keyboard input into scene mutations.
//!
//! Every handler mutates the local [`Scene`] directly and returns the list of
//! committed [`SceneChange`]s that must be mirrored to other participants.
//! Intermediate frames of a gesture (dragging, resizing) touch only the local
//! scene; the change is reported once, on pointer-up.

use crate::camera::{Camera, ZOOM_OUT_STEP, ZOOM_STEP};
use crate::elements::{
    Arrow, BoxShape, DEFAULT_TEXT_COLOR, DEFAULT_TEXT_FONT_SIZE, DEFAULT_TEXT_WIDTH, Element,
    ElementId, NEW_NOTE_WIDTH, Note, Stroke, TextBox,
};
use crate::geometry::{HitMode, anchor_box, endpoint_at, hit_test};
use crate::input::{InputState, Key, Modifiers, MouseButton, PointerEvent};
use crate::layout::{label_fractions_at, label_position};
use crate::scene::Scene;
use crate::selection::{ResizeState, finalize_geometry, handle_under};
use crate::text_edit::{EditBuffer, TextEditResult};
use crate::tools::{ToolKind, ToolSettings};
use kurbo::{Point, Rect, Vec2};
use std::time::Instant;

/// Half-size of the square around a label anchor that grabs the label (screen px).
pub const LABEL_GRAB_PX: f64 = 4.0;

/// A committed change to broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneChange {
    Added(Element),
    Updated(Element),
    Removed(ElementId),
    Cleared,
}

/// Gesture driven by the pointer.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    /// New element under construction; not in the scene yet.
    Drafting { element: Element, origin: Point },
    DraggingElement {
        start: Point,
        original: Element,
    },
    Resizing(ResizeState),
    DraggingLabel {
        original: Element,
    },
    /// Middle-button pan. `grab` is the pointer position minus pan at press time.
    Panning { grab: Vec2 },
}

impl Gesture {
    /// Button whose release finishes the gesture.
    fn button(&self) -> Option<MouseButton> {
        match self {
            Gesture::Idle => None,
            Gesture::Panning { .. } => Some(MouseButton::Middle),
            _ => Some(MouseButton::Left),
        }
    }
}

/// What an inline edit writes to when confirmed.
#[derive(Debug, Clone)]
enum EditTarget {
    Existing(ElementId),
    New(Element),
}

#[derive(Debug, Clone)]
struct EditSession {
    target: EditTarget,
    buffer: EditBuffer,
}

/// Coarse controller state, for queries and rendering decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Idle,
    Drafting,
    DraggingElement,
    Resizing,
    DraggingLabel,
    Panning,
    Editing,
}

/// Pointer/keyboard state machine for one client.
#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Gesture,
    edit: Option<EditSession>,
    selected: Option<ElementId>,
    hovered: Option<ElementId>,
    input: InputState,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        if self.edit.is_some() {
            return InteractionMode::Editing;
        }
        match self.gesture {
            Gesture::Idle => InteractionMode::Idle,
            Gesture::Drafting { .. } => InteractionMode::Drafting,
            Gesture::DraggingElement { .. } => InteractionMode::DraggingElement,
            Gesture::Resizing(_) => InteractionMode::Resizing,
            Gesture::DraggingLabel { .. } => InteractionMode::DraggingLabel,
            Gesture::Panning { .. } => InteractionMode::Panning,
        }
    }

    pub fn selected(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    pub fn hovered(&self) -> Option<&ElementId> {
        self.hovered.as_ref()
    }

    pub fn select(&mut self, id: Option<ElementId>) {
        self.selected = id;
    }

    /// Element being drafted, drawn above the committed scene.
    pub fn draft(&self) -> Option<&Element> {
        match &self.gesture {
            Gesture::Drafting { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.input.set_modifiers(modifiers);
    }

    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    pub fn edit_buffer(&self) -> Option<&EditBuffer> {
        self.edit.as_ref().map(|e| &e.buffer)
    }

    /// Element under edit with the uncommitted text applied.
    pub fn editing_preview(&self, scene: &Scene) -> Option<Element> {
        let edit = self.edit.as_ref()?;
        let mut element = match &edit.target {
            EditTarget::Existing(id) => scene.get(id)?.clone(),
            EditTarget::New(element) => element.clone(),
        };
        element.set_text_content(edit.buffer.text().to_string());
        Some(element)
    }

    /// Screen-space rectangle for the inline editor overlay.
    pub fn edit_overlay_rect(&self, scene: &Scene, camera: &Camera) -> Option<Rect> {
        let preview = self.editing_preview(scene)?;
        let rect = anchor_box(&preview)?;
        Some(camera.transform().transform_rect_bbox(rect))
    }

    /// Dispatch a pointer event received at `now`.
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        now: Instant,
        scene: &mut Scene,
        camera: &mut Camera,
        tools: &ToolSettings,
    ) -> Vec<SceneChange> {
        let double_click = self.input.handle_pointer_event(event, now);
        match *event {
            PointerEvent::Down { position, button } => {
                self.pointer_down(position, button, double_click, scene, camera, tools)
            }
            PointerEvent::Move { position } => {
                self.pointer_move(position, scene, camera, tools);
                Vec::new()
            }
            PointerEvent::Up { button, .. } => {
                if self.gesture.button() == Some(button) {
                    self.pointer_up(scene)
                } else {
                    Vec::new()
                }
            }
            PointerEvent::Leave => self.pointer_up(scene),
            PointerEvent::Scroll { position, delta } => {
                self.wheel(position, delta, camera);
                Vec::new()
            }
        }
    }

    fn pointer_down(
        &mut self,
        screen: Point,
        button: MouseButton,
        double_click: bool,
        scene: &mut Scene,
        camera: &mut Camera,
        tools: &ToolSettings,
    ) -> Vec<SceneChange> {
        // Other buttons are ignored until the current gesture is released.
        if !matches!(self.gesture, Gesture::Idle) {
            log::debug!("ignoring {:?} press during {:?}", button, self.mode());
            return Vec::new();
        }

        // Clicking anywhere blurs the inline editor.
        let mut changes = self.commit_edit(scene);

        if button == MouseButton::Middle {
            self.gesture = Gesture::Panning {
                grab: screen.to_vec2() - camera.pan,
            };
            return changes;
        }
        if button != MouseButton::Left {
            return changes;
        }

        let world = camera.screen_to_world(screen);
        if double_click && self.begin_edit_at(world, scene, camera.scale) {
            return changes;
        }

        if tools.tool == ToolKind::Arrow {
            let target = hit_test(world, scene, camera.scale, HitMode::Arrow);
            let start = endpoint_at(world, target.as_ref().and_then(|id| scene.get(id)));
            let arrow = Arrow {
                id: ElementId::new(),
                from: start.clone(),
                to: start,
                color: tools.color.clone(),
            };
            self.gesture = Gesture::Drafting {
                element: Element::Arrow(arrow),
                origin: world,
            };
            return changes;
        }

        let hit = hit_test(world, scene, camera.scale, HitMode::Default);
        if let Some(id) = hit {
            if tools.tool == ToolKind::Eraser {
                changes.extend(self.erase(&id, scene));
            } else if let Some(element) = scene.get(&id) {
                self.gesture = manipulation_for(element, world, camera.scale);
                self.selected = Some(id);
            }
            return changes;
        }

        self.selected = None;
        match tools.tool {
            ToolKind::Pen => {
                let stroke = Stroke {
                    id: ElementId::new(),
                    color: tools.color.clone(),
                    width: tools.size,
                    points: vec![world],
                };
                self.gesture = Gesture::Drafting {
                    element: Element::Stroke(stroke),
                    origin: world,
                };
            }
            ToolKind::Note => {
                let note = Note {
                    id: ElementId::new(),
                    x: world.x,
                    y: world.y,
                    w: NEW_NOTE_WIDTH,
                    h: None,
                    text: String::new(),
                };
                self.begin_new_edit(Element::Note(note));
            }
            ToolKind::Text => {
                let text = TextBox {
                    id: ElementId::new(),
                    x: world.x,
                    y: world.y,
                    w: DEFAULT_TEXT_WIDTH,
                    text: String::new(),
                    color: DEFAULT_TEXT_COLOR.to_string(),
                    font_size: DEFAULT_TEXT_FONT_SIZE,
                };
                self.begin_new_edit(Element::Text(text));
            }
            ToolKind::Rect | ToolKind::Ellipse | ToolKind::Diamond => {
                if let Some(kind) = tools.tool.box_kind() {
                    let shape = BoxShape::new(world.x, world.y, 1.0, 1.0, tools.color.clone());
                    self.gesture = Gesture::Drafting {
                        element: Element::from_box(kind, shape),
                        origin: world,
                    };
                }
            }
            ToolKind::Select | ToolKind::Arrow | ToolKind::Eraser => {}
        }
        changes
    }

    fn pointer_move(
        &mut self,
        screen: Point,
        scene: &mut Scene,
        camera: &mut Camera,
        tools: &ToolSettings,
    ) {
        let world = camera.screen_to_world(screen);
        let scale = camera.scale;
        match &mut self.gesture {
            Gesture::Idle => {
                self.hovered = if tools.tool == ToolKind::Select && self.edit.is_none() {
                    hit_test(world, scene, scale, HitMode::Default)
                } else {
                    None
                };
            }
            Gesture::Panning { grab } => {
                camera.set_pan(screen.to_vec2() - *grab);
            }
            Gesture::Drafting { element, origin } => match element {
                Element::Stroke(stroke) => stroke.points.push(world),
                Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => {
                    b.w = world.x - origin.x;
                    b.h = world.y - origin.y;
                }
                Element::Arrow(arrow) => {
                    let target = hit_test(world, scene, scale, HitMode::Arrow);
                    arrow.to = endpoint_at(world, target.as_ref().and_then(|id| scene.get(id)));
                }
                Element::Note(_) | Element::Text(_) => {}
            },
            Gesture::DraggingElement { start, original } => {
                let mut moved = original.clone();
                moved.translate(world - *start);
                scene.replace(moved);
            }
            Gesture::Resizing(state) => {
                scene.replace(state.apply(world));
            }
            Gesture::DraggingLabel { original } => {
                let mut moved = original.clone();
                if let Some(shape) = moved.as_box_mut() {
                    let (fx, fy) = label_fractions_at(shape, world);
                    shape.label_fx = fx;
                    shape.label_fy = fy;
                }
                scene.replace(moved);
            }
        }
    }

    fn pointer_up(&mut self, scene: &mut Scene) -> Vec<SceneChange> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Panning { .. } => Vec::new(),
            Gesture::Drafting { mut element, .. } => {
                finalize_geometry(&mut element);
                scene.append(element.clone());
                vec![SceneChange::Added(element)]
            }
            Gesture::DraggingElement { original, .. } | Gesture::DraggingLabel { original } => {
                changed_since(&original, scene).into_iter().collect()
            }
            Gesture::Resizing(state) => {
                if let Some(current) = scene.get(state.original.id()) {
                    let mut finished = current.clone();
                    finalize_geometry(&mut finished);
                    scene.replace(finished);
                }
                changed_since(&state.original, scene).into_iter().collect()
            }
        }
    }

    /// Modifier-gated wheel zoom around the pointer.
    fn wheel(&mut self, screen: Point, delta: Vec2, camera: &mut Camera) {
        if !self.input.modifiers.zoom_modifier() {
            return;
        }
        let factor = if delta.y < 0.0 { ZOOM_STEP } else { ZOOM_OUT_STEP };
        camera.zoom_at(screen, factor);
    }

    /// Handle a key press. Keys go to the inline editor while one is open.
    pub fn handle_key(&mut self, key: &Key, scene: &mut Scene) -> Vec<SceneChange> {
        let modifiers = self.input.modifiers;
        if let Some(edit) = &mut self.edit {
            return match edit.buffer.handle_key(key, modifiers) {
                TextEditResult::Commit => self.commit_edit(scene),
                TextEditResult::Cancel => {
                    self.edit = None;
                    Vec::new()
                }
                TextEditResult::Handled | TextEditResult::NotHandled => Vec::new(),
            };
        }
        match key {
            Key::Delete | Key::Backspace if matches!(self.gesture, Gesture::Idle) => {
                self.delete_selected(scene)
            }
            Key::Escape => {
                if matches!(self.gesture, Gesture::Drafting { .. }) {
                    self.gesture = Gesture::Idle;
                } else {
                    self.selected = None;
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Remove the selected element, if any.
    pub fn delete_selected(&mut self, scene: &mut Scene) -> Vec<SceneChange> {
        match self.selected.clone() {
            Some(id) => self.erase(&id, scene),
            None => Vec::new(),
        }
    }

    /// Empty the board.
    pub fn clear_board(&mut self, scene: &mut Scene) -> Vec<SceneChange> {
        scene.clear();
        self.gesture = Gesture::Idle;
        self.edit = None;
        self.selected = None;
        self.hovered = None;
        vec![SceneChange::Cleared]
    }

    /// Drop references to elements that disappeared after remote changes.
    pub fn reconcile(&mut self, scene: &Scene) {
        if self.selected.as_ref().is_some_and(|id| !scene.contains(id)) {
            self.selected = None;
        }
        if self.hovered.as_ref().is_some_and(|id| !scene.contains(id)) {
            self.hovered = None;
        }
        let gesture_target = match &self.gesture {
            Gesture::DraggingElement { original, .. } | Gesture::DraggingLabel { original } => {
                Some(original.id())
            }
            Gesture::Resizing(state) => Some(state.original.id()),
            _ => None,
        };
        if gesture_target.is_some_and(|id| !scene.contains(id)) {
            log::debug!("gesture target removed remotely");
            self.gesture = Gesture::Idle;
        }
        if let Some(EditSession {
            target: EditTarget::Existing(id),
            ..
        }) = &self.edit
        {
            if !scene.contains(id) {
                self.edit = None;
            }
        }
    }

    fn erase(&mut self, id: &ElementId, scene: &mut Scene) -> Vec<SceneChange> {
        if scene.remove(id).is_none() {
            return Vec::new();
        }
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
        vec![SceneChange::Removed(id.clone())]
    }

    fn begin_new_edit(&mut self, element: Element) {
        self.edit = Some(EditSession {
            target: EditTarget::New(element),
            buffer: EditBuffer::new(""),
        });
    }

    /// Open the inline editor on the text-bearing element under `world`.
    fn begin_edit_at(&mut self, world: Point, scene: &Scene, scale: f64) -> bool {
        let Some(id) = hit_test(world, scene, scale, HitMode::Default) else {
            return false;
        };
        let Some(text) = scene.get(&id).and_then(Element::text_content) else {
            return false;
        };
        self.gesture = Gesture::Idle;
        self.edit = Some(EditSession {
            buffer: EditBuffer::new(text),
            target: EditTarget::Existing(id.clone()),
        });
        self.selected = Some(id);
        true
    }

    /// Confirm the open inline edit, if any.
    pub fn commit_edit(&mut self, scene: &mut Scene) -> Vec<SceneChange> {
        let Some(edit) = self.edit.take() else {
            return Vec::new();
        };
        let text = edit.buffer.into_text();
        match edit.target {
            EditTarget::Existing(id) => {
                let Some(current) = scene.get(&id) else {
                    return Vec::new();
                };
                if current.text_content() == Some(text.as_str()) {
                    return Vec::new();
                }
                let mut updated = current.clone();
                updated.set_text_content(text);
                scene.replace(updated.clone());
                vec![SceneChange::Updated(updated)]
            }
            EditTarget::New(mut element) => {
                if matches!(element, Element::Text(_)) && text.trim().is_empty() {
                    return Vec::new();
                }
                element.set_text_content(text);
                scene.append(element.clone());
                vec![SceneChange::Added(element)]
            }
        }
    }

    /// Abandon the open inline edit.
    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }
}

/// Gesture for a press on `element` at `world`: label drag, resize or move.
fn manipulation_for(element: &Element, world: Point, scale: f64) -> Gesture {
    if let Some((_, shape)) = element.as_box() {
        if !shape.label.is_empty() {
            let anchor = label_position(shape);
            let grab = LABEL_GRAB_PX / scale;
            if (world.x - anchor.x).abs() <= grab && (world.y - anchor.y).abs() <= grab {
                return Gesture::DraggingLabel {
                    original: element.clone(),
                };
            }
        }
    }
    if let Some(handle) = handle_under(element, world, scale) {
        return Gesture::Resizing(ResizeState::new(handle, world, element.clone()));
    }
    Gesture::DraggingElement {
        start: world,
        original: element.clone(),
    }
}

/// Update for the element if it differs from `original`.
fn changed_since(original: &Element, scene: &Scene) -> Option<SceneChange> {
    let current = scene.get(original.id())?;
    (current != original).then(|| SceneChange::Updated(current.clone()))
}
