//! Selection handles and resize manipulation.

use crate::elements::{BoxShape, Element, Note, TextBox};
use crate::layout::{note_height, note_rect, text_rect};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 12.0;
/// Half-extent of a handle's hit zone in screen pixels.
pub const HANDLE_HIT_RADIUS: f64 = 12.0;
/// Minimum committed width of a shape.
pub const MIN_SHAPE_WIDTH: f64 = 40.0;
/// Minimum committed height of a shape.
pub const MIN_SHAPE_HEIGHT: f64 = 30.0;
/// Minimum committed width of a text block.
pub const MIN_TEXT_WIDTH: f64 = 100.0;
/// Text font size range reachable through the resize handles.
pub const TEXT_FONT_SIZE_RANGE: (f64, f64) = (10.0, 96.0);

/// Compass position of a resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    North,
    South,
    West,
    East,
}

impl HandleKind {
    pub fn moves_north(self) -> bool {
        matches!(self, Self::North | Self::NorthWest | Self::NorthEast)
    }

    pub fn moves_south(self) -> bool {
        matches!(self, Self::South | Self::SouthWest | Self::SouthEast)
    }

    pub fn moves_west(self) -> bool {
        matches!(self, Self::West | Self::NorthWest | Self::SouthWest)
    }

    pub fn moves_east(self) -> bool {
        matches!(self, Self::East | Self::NorthEast | Self::SouthEast)
    }
}

/// A selection handle with its position and type.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    /// Position in world coordinates.
    pub position: Point,
    /// Handle type.
    pub kind: HandleKind,
}

impl Handle {
    /// Create a new handle.
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point (in world coordinates) falls in this handle's square zone.
    /// `radius` should be adjusted for camera zoom.
    pub fn hit_test(&self, point: Point, radius: f64) -> bool {
        (point.x - self.position.x).abs() <= radius && (point.y - self.position.y).abs() <= radius
    }
}

/// Corner and side handles of a box, corners first.
fn box_handles(bounds: Rect) -> Vec<Handle> {
    let c = bounds.center();
    vec![
        Handle::new(Point::new(bounds.x0, bounds.y0), HandleKind::NorthWest),
        Handle::new(Point::new(bounds.x1, bounds.y0), HandleKind::NorthEast),
        Handle::new(Point::new(bounds.x0, bounds.y1), HandleKind::SouthWest),
        Handle::new(Point::new(bounds.x1, bounds.y1), HandleKind::SouthEast),
        Handle::new(Point::new(c.x, bounds.y0), HandleKind::North),
        Handle::new(Point::new(c.x, bounds.y1), HandleKind::South),
        Handle::new(Point::new(bounds.x0, c.y), HandleKind::West),
        Handle::new(Point::new(bounds.x1, c.y), HandleKind::East),
    ]
}

/// Get the selection handles for an element.
///
/// Shapes and notes get corners and sides, text gets e/s/se, strokes and arrows none.
pub fn get_handles(element: &Element) -> Vec<Handle> {
    match element {
        Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => box_handles(b.rect()),
        Element::Note(n) => box_handles(note_rect(n)),
        Element::Text(t) => {
            let r = text_rect(t);
            let c = r.center();
            vec![
                Handle::new(Point::new(r.x1, c.y), HandleKind::East),
                Handle::new(Point::new(c.x, r.y1), HandleKind::South),
                Handle::new(Point::new(r.x1, r.y1), HandleKind::SouthEast),
            ]
        }
        Element::Stroke(_) | Element::Arrow(_) => Vec::new(),
    }
}

/// Find the handle under a world point. The hit radius is in screen pixels.
pub fn handle_under(element: &Element, point: Point, scale: f64) -> Option<HandleKind> {
    let radius = HANDLE_HIT_RADIUS / scale;
    get_handles(element)
        .into_iter()
        .find(|h| h.hit_test(point, radius))
        .map(|h| h.kind)
}

/// State of an in-progress resize.
#[derive(Debug, Clone)]
pub struct ResizeState {
    /// Handle being dragged.
    pub handle: HandleKind,
    /// World point where the drag started.
    pub start_point: Point,
    /// Element as it was when the drag started.
    pub original: Element,
}

impl ResizeState {
    pub fn new(handle: HandleKind, start_point: Point, original: Element) -> Self {
        Self {
            handle,
            start_point,
            original,
        }
    }

    /// Element resized for the pointer at `current`.
    ///
    /// No floors are applied here; extents may go negative mid-gesture and are
    /// normalized by [`finalize_geometry`] at commit.
    pub fn apply(&self, current: Point) -> Element {
        let mut element = self.original.clone();
        match &mut element {
            Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => {
                resize_box(b, self.handle, current);
            }
            Element::Note(n) => resize_note(n, self.handle, current),
            Element::Text(t) => {
                let fs0 = t.font_size;
                resize_text(t, self.handle, current, current.y - self.start_point.y, fs0);
            }
            Element::Stroke(_) | Element::Arrow(_) => {}
        }
        element
    }
}

fn resize_box(b: &mut BoxShape, handle: HandleKind, pt: Point) {
    if handle.moves_north() {
        b.h = b.y + b.h - pt.y;
        b.y = pt.y;
    }
    if handle.moves_west() {
        b.w = b.x + b.w - pt.x;
        b.x = pt.x;
    }
    if handle.moves_south() {
        b.h = pt.y - b.y;
    }
    if handle.moves_east() {
        b.w = pt.x - b.x;
    }
}

fn resize_note(n: &mut Note, handle: HandleKind, pt: Point) {
    let bottom = n.y + note_height(n);
    if handle.moves_west() {
        n.w = n.x + n.w - pt.x;
        n.x = pt.x;
    }
    if handle.moves_east() {
        n.w = pt.x - n.x;
    }
    if handle.moves_north() {
        n.h = Some(bottom - pt.y);
        n.y = pt.y;
    }
    if handle.moves_south() {
        n.h = Some(pt.y - n.y);
    }
}

fn resize_text(t: &mut TextBox, handle: HandleKind, pt: Point, dy: f64, fs0: f64) {
    if handle.moves_east() {
        t.w = pt.x - t.x;
    }
    if handle.moves_south() {
        let (lo, hi) = TEXT_FONT_SIZE_RANGE;
        t.font_size = (fs0 + dy).round().clamp(lo, hi);
    }
}

/// Normalize geometry at the end of a create or resize gesture.
///
/// Negative extents flip to a top-left origin with positive size, then the
/// minimum sizes are applied.
pub fn finalize_geometry(element: &mut Element) {
    match element {
        Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => {
            if b.w < 0.0 {
                b.x += b.w;
                b.w = -b.w;
            }
            if b.h < 0.0 {
                b.y += b.h;
                b.h = -b.h;
            }
            b.w = b.w.max(MIN_SHAPE_WIDTH);
            b.h = b.h.max(MIN_SHAPE_HEIGHT);
        }
        Element::Note(n) => {
            if n.w < 0.0 {
                n.x += n.w;
                n.w = -n.w;
            }
            n.w = n.w.max(MIN_SHAPE_WIDTH);
            if let Some(h) = n.h {
                if h < 0.0 {
                    n.y += h;
                }
                n.h = Some(h.abs().max(MIN_SHAPE_HEIGHT));
            }
        }
        Element::Text(t) => {
            t.w = t.w.max(MIN_TEXT_WIDTH);
        }
        Element::Stroke(_) | Element::Arrow(_) => {}
    }
}
