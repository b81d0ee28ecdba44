//! Board elements and their wire representation.
//!
//! Every element serializes as a flat JSON object tagged by `type`, matching the
//! format exchanged with peers and stored by the persistence layer.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default draw color.
pub const DEFAULT_COLOR: &str = "#2563eb";
/// Default ink color for text.
pub const DEFAULT_TEXT_COLOR: &str = "#111827";
/// Default stroke width.
pub const DEFAULT_STROKE_WIDTH: f64 = 3.0;
/// Note width used when the wire object carries none.
pub const DEFAULT_NOTE_WIDTH: f64 = 220.0;
/// Width given to freshly created notes.
pub const NEW_NOTE_WIDTH: f64 = 260.0;
/// Default text block width.
pub const DEFAULT_TEXT_WIDTH: f64 = 260.0;
/// Default text font size.
pub const DEFAULT_TEXT_FONT_SIZE: f64 = 18.0;
/// Default label font size for shapes.
pub const DEFAULT_LABEL_FONT_SIZE: f64 = 14.0;

/// Unique identifier for an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection point on an element's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Anchor {
    #[serde(rename = "n")]
    North,
    #[serde(rename = "s")]
    South,
    #[serde(rename = "e")]
    East,
    #[serde(rename = "w")]
    West,
    #[serde(rename = "c")]
    Center,
}

impl Anchor {
    pub const ALL: [Anchor; 5] = [
        Anchor::North,
        Anchor::South,
        Anchor::East,
        Anchor::West,
        Anchor::Center,
    ];
}

/// An arrow end attached to another element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "elId")]
    pub el_id: ElementId,
    pub anchor: Anchor,
    /// Last resolved position, used when the target is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<Point>,
}

/// One end of an arrow: either bound to an element anchor or a free world point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Bound(Binding),
    Free(Point),
}

impl Endpoint {
    pub fn bound(el_id: ElementId, anchor: Anchor, at: Point) -> Self {
        Endpoint::Bound(Binding {
            el_id,
            anchor,
            last: Some(at),
        })
    }

    /// Id of the bound target, if any.
    pub fn target(&self) -> Option<&ElementId> {
        match self {
            Endpoint::Bound(b) => Some(&b.el_id),
            Endpoint::Free(_) => None,
        }
    }
}

/// Freehand ink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: ElementId,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(alias = "size", default = "default_stroke_width")]
    pub width: f64,
    #[serde(default)]
    pub points: Vec<Point>,
}

/// Sticky note. Height follows the text length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_note_width")]
    pub w: f64,
    /// Minimum height set by a vertical resize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default)]
    pub text: String,
}

/// Rectangle, ellipse or diamond with an optional label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxShape {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "half")]
    pub label_fx: f64,
    #[serde(default = "half")]
    pub label_fy: f64,
    #[serde(default = "default_label_font_size")]
    pub font_size: f64,
}

impl BoxShape {
    pub fn new(x: f64, y: f64, w: f64, h: f64, color: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(),
            x,
            y,
            w,
            h,
            color: color.into(),
            label: String::new(),
            label_fx: 0.5,
            label_fy: 0.5,
            font_size: DEFAULT_LABEL_FONT_SIZE,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.w, self.y + self.h)
    }
}

/// Connector between two endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub id: ElementId,
    pub from: Endpoint,
    pub to: Endpoint,
    #[serde(default = "default_color")]
    pub color: String,
}

/// Free-standing text block. Height follows the wrapped line count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_text_width")]
    pub w: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default = "default_text_font_size")]
    pub font_size: f64,
}

/// Kind of a box-shaped element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKind {
    Rect,
    Ellipse,
    Diamond,
}

/// A whiteboard element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Stroke(Stroke),
    Note(Note),
    Rect(BoxShape),
    Ellipse(BoxShape),
    Diamond(BoxShape),
    Arrow(Arrow),
    Text(TextBox),
}

/// Errors produced while decoding an element from the wire.
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("element is not an object")]
    NotAnObject,
    #[error("unknown element type: {0}")]
    UnknownType(String),
    #[error("element has an empty id")]
    EmptyId,
    #[error("malformed element: {0}")]
    Malformed(#[from] serde_json::Error),
}

const KNOWN_TYPES: [&str; 7] = ["stroke", "note", "rect", "ellipse", "diamond", "arrow", "text"];

impl Element {
    /// Decode an element from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ElementError> {
        let kind = value
            .as_object()
            .ok_or(ElementError::NotAnObject)?
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        if !KNOWN_TYPES.contains(&kind.as_str()) {
            return Err(ElementError::UnknownType(kind));
        }
        let element: Element = serde_json::from_value(value)?;
        if element.id().as_str().is_empty() {
            return Err(ElementError::EmptyId);
        }
        Ok(element)
    }

    /// Encode to a JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn id(&self) -> &ElementId {
        match self {
            Element::Stroke(s) => &s.id,
            Element::Note(n) => &n.id,
            Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => &b.id,
            Element::Arrow(a) => &a.id,
            Element::Text(t) => &t.id,
        }
    }

    /// Wire name of the element type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Stroke(_) => "stroke",
            Element::Note(_) => "note",
            Element::Rect(_) => "rect",
            Element::Ellipse(_) => "ellipse",
            Element::Diamond(_) => "diamond",
            Element::Arrow(_) => "arrow",
            Element::Text(_) => "text",
        }
    }

    /// Box shape and its kind, for rect/ellipse/diamond.
    pub fn as_box(&self) -> Option<(BoxKind, &BoxShape)> {
        match self {
            Element::Rect(b) => Some((BoxKind::Rect, b)),
            Element::Ellipse(b) => Some((BoxKind::Ellipse, b)),
            Element::Diamond(b) => Some((BoxKind::Diamond, b)),
            _ => None,
        }
    }

    pub fn as_box_mut(&mut self) -> Option<&mut BoxShape> {
        match self {
            Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => Some(b),
            _ => None,
        }
    }

    /// Build a box element of the given kind.
    pub fn from_box(kind: BoxKind, shape: BoxShape) -> Self {
        match kind {
            BoxKind::Rect => Element::Rect(shape),
            BoxKind::Ellipse => Element::Ellipse(shape),
            BoxKind::Diamond => Element::Diamond(shape),
        }
    }

    /// The editable text of the element, if it carries one.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            Element::Note(n) => Some(&n.text),
            Element::Text(t) => Some(&t.text),
            Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => Some(&b.label),
            Element::Stroke(_) | Element::Arrow(_) => None,
        }
    }

    /// Replace the editable text. Returns false for elements without text.
    pub fn set_text_content(&mut self, text: String) -> bool {
        match self {
            Element::Note(n) => n.text = text,
            Element::Text(t) => t.text = text,
            Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => b.label = text,
            Element::Stroke(_) | Element::Arrow(_) => return false,
        }
        true
    }

    /// Move the element by a world-space delta.
    ///
    /// Bound arrow ends stay attached to their targets.
    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Element::Stroke(s) => {
                for p in &mut s.points {
                    *p += delta;
                }
            }
            Element::Note(n) => {
                n.x += delta.x;
                n.y += delta.y;
            }
            Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => {
                b.x += delta.x;
                b.y += delta.y;
            }
            Element::Arrow(a) => {
                for end in [&mut a.from, &mut a.to] {
                    if let Endpoint::Free(p) = end {
                        *p += delta;
                    }
                }
            }
            Element::Text(t) => {
                t.x += delta.x;
                t.y += delta.y;
            }
        }
    }
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

fn default_stroke_width() -> f64 {
    DEFAULT_STROKE_WIDTH
}

fn default_note_width() -> f64 {
    DEFAULT_NOTE_WIDTH
}

fn default_text_width() -> f64 {
    DEFAULT_TEXT_WIDTH
}

fn default_text_font_size() -> f64 {
    DEFAULT_TEXT_FONT_SIZE
}

fn default_label_font_size() -> f64 {
    DEFAULT_LABEL_FONT_SIZE
}

fn half() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rect_wire_format() {
        let mut shape = BoxShape::new(0.0, 0.0, 100.0, 100.0, "#2563eb");
        shape.id = ElementId::from("r1");
        let value = Element::Rect(shape).to_value();
        assert_eq!(value["type"], "rect");
        assert_eq!(value["id"], "r1");
        assert_eq!(value["labelFx"], 0.5);
        assert_eq!(value["fontSize"], 14.0);
    }

    #[test]
    fn test_decode_arrow_endpoints() {
        let value = json!({
            "type": "arrow",
            "id": "a1",
            "from": { "elId": "r1", "anchor": "e" },
            "to": { "x": 10.0, "y": 20.0 },
            "color": "#111827"
        });
        let Element::Arrow(arrow) = Element::from_value(value).unwrap() else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.from.target(), Some(&ElementId::from("r1")));
        assert_eq!(arrow.to, Endpoint::Free(Point::new(10.0, 20.0)));
    }

    #[test]
    fn test_decode_applies_defaults() {
        let value = json!({ "type": "note", "id": "n1", "x": 1.0, "y": 2.0 });
        let Element::Note(note) = Element::from_value(value).unwrap() else {
            panic!("expected note");
        };
        assert_eq!(note.w, DEFAULT_NOTE_WIDTH);
        assert!(note.text.is_empty());
        assert!(note.h.is_none());
    }

    #[test]
    fn test_stroke_accepts_size_alias() {
        let value = json!({
            "type": "stroke",
            "id": "s1",
            "color": "#111827",
            "size": 6.0,
            "points": [{ "x": 0.0, "y": 0.0 }]
        });
        let Element::Stroke(stroke) = Element::from_value(value).unwrap() else {
            panic!("expected stroke");
        };
        assert_eq!(stroke.width, 6.0);
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let result = Element::from_value(json!({ "type": "hexagon", "id": "h" }));
        assert!(matches!(result, Err(ElementError::UnknownType(t)) if t == "hexagon"));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let result = Element::from_value(json!({ "type": "rect", "id": "r", "x": "left" }));
        assert!(matches!(result, Err(ElementError::Malformed(_))));
        let result = Element::from_value(json!([1, 2, 3]));
        assert!(matches!(result, Err(ElementError::NotAnObject)));
        let result = Element::from_value(json!({ "type": "note", "id": "", "x": 0, "y": 0 }));
        assert!(matches!(result, Err(ElementError::EmptyId)));
    }

    #[test]
    fn test_translate_keeps_bound_ends() {
        let mut arrow = Element::Arrow(Arrow {
            id: ElementId::new(),
            from: Endpoint::bound(ElementId::from("r1"), Anchor::East, Point::new(5.0, 5.0)),
            to: Endpoint::Free(Point::new(50.0, 50.0)),
            color: DEFAULT_COLOR.to_string(),
        });
        arrow.translate(Vec2::new(10.0, -10.0));
        let Element::Arrow(a) = arrow else { unreachable!() };
        assert!(matches!(a.from, Endpoint::Bound(_)));
        assert_eq!(a.to, Endpoint::Free(Point::new(60.0, 40.0)));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ElementId::new(), ElementId::new());
    }
}
