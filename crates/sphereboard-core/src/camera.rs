//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom level.
pub const MIN_SCALE: f64 = 0.25;
/// Largest zoom level.
pub const MAX_SCALE: f64 = 4.0;
/// Pan of a freshly opened board.
pub const INITIAL_PAN: Vec2 = Vec2::new(40.0, 40.0);
/// Fraction of the remaining distance covered per animation tick.
pub const EASING: f64 = 0.15;
/// Zoom factor applied per wheel notch or zoom button press.
pub const ZOOM_STEP: f64 = 1.1;
/// Zoom factor applied per wheel notch or button press when zooming out.
pub const ZOOM_OUT_STEP: f64 = 0.9;

const PAN_EPSILON: f64 = 0.5;
const SCALE_EPSILON: f64 = 0.001;

/// Camera manages the view transform for the canvas.
///
/// `screen = world * scale + pan`. Zoom requests set a target that the current
/// transform eases toward on every [`Camera::tick`]; direct pans apply immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation (screen pixels)
    pub pan: Vec2,
    /// Current zoom level
    pub scale: f64,
    /// Pan being eased toward
    pub target_pan: Vec2,
    /// Zoom level being eased toward
    pub target_scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: INITIAL_PAN,
            scale: 1.0,
            target_pan: INITIAL_PAN,
            target_scale: 1.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.scale)
    }

    /// Get the inverse transform for input handling.
    ///
    /// This transform converts screen coordinates to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.pan)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Set the pan immediately, cancelling any pan easing.
    pub fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
        self.target_pan = pan;
    }

    /// Pan by a delta in screen coordinates, immediately.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.set_pan(self.pan + delta);
    }

    /// Zoom by `factor`, keeping the world point under `screen_point` fixed.
    ///
    /// Only the target is changed; the transform follows through [`Camera::tick`].
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let world = self.screen_to_world(screen_point);
        self.target_scale = new_scale;
        self.target_pan = screen_point.to_vec2() - world.to_vec2() * new_scale;
    }

    /// Zoom around the center of the viewport.
    pub fn zoom_center(&mut self, viewport: Size, factor: f64) {
        let center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
        self.zoom_at(center, factor);
    }

    /// Ease back to the initial view.
    pub fn fit(&mut self) {
        self.target_pan = INITIAL_PAN;
        self.target_scale = 1.0;
    }

    /// Whether the transform has not yet reached its target.
    pub fn is_animating(&self) -> bool {
        let pan_diff =
            (self.pan.x - self.target_pan.x).abs() + (self.pan.y - self.target_pan.y).abs();
        let scale_diff = (self.scale - self.target_scale).abs();
        pan_diff > PAN_EPSILON || scale_diff > SCALE_EPSILON
    }

    /// Advance easing by one frame. Returns true while still animating.
    ///
    /// Once within epsilon the transform snaps to the target and easing stops.
    pub fn tick(&mut self) -> bool {
        if !self.is_animating() {
            self.pan = self.target_pan;
            self.scale = self.target_scale;
            return false;
        }
        self.pan = self.pan.lerp(self.target_pan, EASING);
        self.scale += (self.target_scale - self.scale) * EASING;
        true
    }

    /// World-space rectangle visible in a viewport.
    pub fn visible_world_rect(&self, viewport: Size) -> Rect {
        Rect::from_points(
            self.screen_to_world(Point::ZERO),
            self.screen_to_world(Point::new(viewport.width, viewport.height)),
        )
    }
}
