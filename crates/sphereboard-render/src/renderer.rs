//! Renderer trait abstraction.

use kurbo::{Affine, Rect, Size};
use peniko::Color;
use sphereboard_core::camera::Camera;
use sphereboard_core::elements::{Element, ElementId};
use sphereboard_core::presence::RemoteCursor;
use sphereboard_core::scene::Scene;
use sphereboard_core::session::BoardSession;
use std::time::Instant;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Element being edited inline, with its uncommitted text.
#[derive(Debug, Clone)]
pub struct EditingView {
    pub element: Element,
    /// Caret position in characters.
    pub caret: usize,
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The board to render.
    pub board: &'a Scene,
    pub camera: &'a Camera,
    /// Viewport size in logical pixels.
    pub viewport_size: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Bottom color of the background gradient. The top is white.
    pub background_color: Color,
    pub show_grid: bool,
    /// Selection outline and handle color.
    pub selection_color: Color,
    pub selected: Option<&'a ElementId>,
    pub hovered: Option<&'a ElementId>,
    /// Element being drawn but not yet committed.
    pub draft: Option<&'a Element>,
    /// Inline edit; the scene copy with the same id is skipped.
    pub editing: Option<EditingView>,
    /// Remote cursors, drawn in screen space on top of everything.
    pub cursors: Vec<&'a RemoteCursor>,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(board: &'a Scene, camera: &'a Camera, viewport_size: Size) -> Self {
        Self {
            board,
            camera,
            viewport_size,
            scale_factor: 1.0,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            show_grid: true,
            selection_color: Color::from_rgba8(37, 99, 235, 230),
            selected: None,
            hovered: None,
            draft: None,
            editing: None,
            cursors: Vec::new(),
        }
    }

    /// Everything a session shows at `now`.
    pub fn from_session(session: &'a BoardSession, now: Instant) -> Self {
        let controller = session.controller();
        let editing = controller
            .editing_preview(session.scene())
            .zip(controller.edit_buffer())
            .map(|(element, buffer)| EditingView {
                element,
                caret: buffer.cursor(),
            });
        Self::new(session.scene(), session.camera(), session.viewport())
            .with_selected(controller.selected())
            .with_hovered(controller.hovered())
            .with_draft(controller.draft())
            .with_editing(editing)
            .with_cursors(session.bridge().cursors().live(now))
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_grid(mut self, show: bool) -> Self {
        self.show_grid = show;
        self
    }

    pub fn with_selected(mut self, id: Option<&'a ElementId>) -> Self {
        self.selected = id;
        self
    }

    pub fn with_hovered(mut self, id: Option<&'a ElementId>) -> Self {
        self.hovered = id;
        self
    }

    pub fn with_draft(mut self, draft: Option<&'a Element>) -> Self {
        self.draft = draft;
        self
    }

    /// Set the inline edit (its scene element will be skipped in build_scene).
    pub fn with_editing(mut self, editing: Option<EditingView>) -> Self {
        self.editing = editing;
        self
    }

    pub fn with_cursors(mut self, cursors: Vec<&'a RemoteCursor>) -> Self {
        self.cursors = cursors;
        self
    }

    /// Logical to physical pixels.
    pub fn device_transform(&self) -> Affine {
        Affine::scale(self.scale_factor)
    }

    /// World to physical pixels.
    pub fn view_transform(&self) -> Affine {
        self.device_transform() * self.camera.transform()
    }

    /// Visible part of the world.
    pub fn visible_world(&self) -> Rect {
        self.camera.visible_world_rect(self.viewport_size)
    }

    /// Whether the element with `id` is drawn from the inline edit instead.
    pub fn is_being_edited(&self, id: &ElementId) -> bool {
        self.editing
            .as_ref()
            .is_some_and(|view| view.element.id() == id)
    }
}

/// Trait for rendering backends.
///
/// Implementations can use Vello, wgpu directly, or other rendering engines.
pub trait Renderer: Send + Sync {
    /// Build the scene/command buffer for a frame.
    ///
    /// This method is called once per frame and should prepare all drawing commands.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

/// Per-element drawing used internally by renderers.
pub trait ElementRenderer {
    /// Render an element with the given world-to-device transform.
    fn render_element(&mut self, element: &Element, board: &Scene, transform: Affine, hovered: bool);

    /// Render the background grid over the visible world rectangle.
    fn render_grid(&mut self, world: Rect, transform: Affine, grid_size: f64);

    /// Render the selection outline and handles for an element.
    fn render_selection(&mut self, element: &Element, board: &Scene, transform: Affine);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphereboard_core::session::SessionConfig;

    #[test]
    fn test_context_defaults() {
        let board = Scene::new();
        let camera = Camera::new();
        let ctx = RenderContext::new(&board, &camera, Size::new(800.0, 600.0));
        assert!(ctx.show_grid);
        assert!(ctx.selected.is_none());
        assert!(ctx.cursors.is_empty());
        assert_eq!(ctx.view_transform(), camera.transform());
    }

    #[test]
    fn test_scale_factor_applies_to_view() {
        let board = Scene::new();
        let mut camera = Camera::new();
        camera.set_pan(kurbo::Vec2::ZERO);
        let ctx = RenderContext::new(&board, &camera, Size::new(800.0, 600.0))
            .with_scale_factor(2.0);
        let p = ctx.view_transform() * kurbo::Point::new(10.0, 5.0);
        assert_eq!(p, kurbo::Point::new(20.0, 10.0));
    }

    #[test]
    fn test_from_idle_session() {
        let session = BoardSession::new("team", &SessionConfig::default());
        let ctx = RenderContext::from_session(&session, Instant::now());
        assert!(ctx.board.is_empty());
        assert!(ctx.editing.is_none());
        assert!(ctx.draft.is_none());
        assert_eq!(ctx.viewport_size, session.viewport());
    }
}
