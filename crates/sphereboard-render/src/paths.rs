//! Backend-independent drawing geometry.
//!
//! Everything here is plain kurbo so it can be checked without a GPU stack.

use kurbo::{BezPath, Point, Rect, RoundedRect, Shape as KurboShape, Vec2};
use peniko::Color;
use sphereboard_core::color::parse_css_color;
use sphereboard_core::elements::{BoxKind, BoxShape, DEFAULT_TEXT_COLOR, Element};
use sphereboard_core::layout::{
    NOTE_FONT_SIZE, NOTE_LINE_HEIGHT, NOTE_PADDING, fit_label, label_inner_size, label_position,
    measure_text, note_lines, text_layout, word_wrap,
};

/// World spacing of grid lines.
pub const GRID_SIZE: f64 = 32.0;
/// The grid is hidden at or below this zoom.
pub const GRID_MIN_SCALE: f64 = 0.5;
/// Corner radius of rectangle shapes.
pub const RECT_RADIUS: f64 = 8.0;
/// Corner radius of note cards.
pub const NOTE_RADIUS: f64 = 12.0;
pub const ARROW_HEAD_LENGTH: f64 = 12.0;
pub const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;
/// Offset of a note's first baseline from its top edge.
pub const NOTE_FIRST_BASELINE: f64 = 20.0;
/// Semibold, used for all board text.
pub const TEXT_WEIGHT: f32 = 600.0;

/// Whether the background grid is drawn at this zoom.
pub fn grid_visible(scale: f64) -> bool {
    scale > GRID_MIN_SCALE
}

/// Grid lines covering `world` as one batched path.
pub fn grid_path(world: Rect, grid_size: f64) -> BezPath {
    let start_x = (world.x0 / grid_size).floor() * grid_size;
    let start_y = (world.y0 / grid_size).floor() * grid_size;
    let end_x = (world.x1 / grid_size).ceil() * grid_size;
    let end_y = (world.y1 / grid_size).ceil() * grid_size;

    let mut path = BezPath::new();
    let mut x = start_x;
    while x <= end_x {
        path.move_to(Point::new(x, start_y));
        path.line_to(Point::new(x, end_y));
        x += grid_size;
    }
    let mut y = start_y;
    while y <= end_y {
        path.move_to(Point::new(start_x, y));
        path.line_to(Point::new(end_x, y));
        y += grid_size;
    }
    path
}

/// Outline of a box shape.
pub fn box_outline(kind: BoxKind, shape: &BoxShape) -> BezPath {
    let rect = shape.rect();
    match kind {
        BoxKind::Rect => {
            let radius = RECT_RADIUS.min(rect.width() / 2.0).min(rect.height() / 2.0);
            RoundedRect::from_rect(rect, radius).to_path(0.1)
        }
        BoxKind::Ellipse => kurbo::Ellipse::from_rect(rect).to_path(0.1),
        BoxKind::Diamond => {
            let c = rect.center();
            let mut path = BezPath::new();
            path.move_to(Point::new(c.x, rect.y0));
            path.line_to(Point::new(rect.x1, c.y));
            path.line_to(Point::new(c.x, rect.y1));
            path.line_to(Point::new(rect.x0, c.y));
            path.close_path();
            path
        }
    }
}

/// Polyline through a stroke's points. A single point becomes a zero-length
/// segment so round caps still show a dot.
pub fn stroke_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((first, rest)) = points.split_first() else {
        return path;
    };
    path.move_to(*first);
    if rest.is_empty() {
        path.line_to(*first);
    }
    for p in rest {
        path.line_to(*p);
    }
    path
}

/// The two barb tips of an arrowhead at `to`, or `None` for a zero-length arrow.
pub fn arrowhead(from: Point, to: Point) -> Option<(Point, Point)> {
    let dir = to - from;
    if dir.hypot2() < 1e-12 {
        return None;
    }
    let angle = dir.atan2();
    let barb = |a: f64| to - Vec2::from_angle(a) * ARROW_HEAD_LENGTH;
    Some((barb(angle - ARROW_HEAD_ANGLE), barb(angle + ARROW_HEAD_ANGLE)))
}

/// Shaft and head of an arrow as one open path.
pub fn arrow_path(from: Point, to: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(from);
    path.line_to(to);
    if let Some((left, right)) = arrowhead(from, to) {
        path.move_to(left);
        path.line_to(to);
        path.line_to(right);
    }
    path
}

/// A single line of board text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Left end of the baseline in world coordinates.
    pub origin: Point,
    pub font_size: f64,
    pub color: Color,
}

fn ink() -> Color {
    parse_css_color(DEFAULT_TEXT_COLOR)
}

/// Text lines an element draws, already wrapped and positioned.
pub fn text_runs(element: &Element) -> Vec<TextRun> {
    match element {
        Element::Note(n) => note_lines(n)
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextRun {
                text,
                origin: Point::new(
                    n.x + NOTE_PADDING,
                    n.y + NOTE_FIRST_BASELINE + i as f64 * NOTE_LINE_HEIGHT,
                ),
                font_size: NOTE_FONT_SIZE,
                color: ink(),
            })
            .collect(),
        Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => {
            if b.label.is_empty() {
                return Vec::new();
            }
            let layout = fit_label(b);
            let pos = label_position(b);
            layout
                .lines
                .into_iter()
                .enumerate()
                .map(|(i, text)| TextRun {
                    text,
                    origin: Point::new(pos.x, pos.y + i as f64 * layout.line_height),
                    font_size: layout.font_size,
                    color: ink(),
                })
                .collect()
        }
        Element::Text(t) => {
            let layout = text_layout(t);
            let color = parse_css_color(&t.color);
            layout
                .lines
                .into_iter()
                .enumerate()
                .filter(|(_, text)| !text.is_empty())
                .map(|(i, text)| TextRun {
                    text,
                    origin: Point::new(t.x, t.y + t.font_size + i as f64 * layout.line_height),
                    font_size: t.font_size,
                    color,
                })
                .collect()
        }
        Element::Stroke(_) | Element::Arrow(_) => Vec::new(),
    }
}

/// Caret bar for an element whose text is being edited, `caret` chars in.
pub fn caret_rect(element: &Element, caret: usize) -> Option<Rect> {
    let text = element.text_content()?;
    let prefix: String = text.chars().take(caret).collect();

    let (origin, font_size, line_height, max_width) = match element {
        Element::Note(n) => (
            Point::new(n.x + NOTE_PADDING, n.y + NOTE_FIRST_BASELINE),
            NOTE_FONT_SIZE,
            NOTE_LINE_HEIGHT,
            n.w - 2.0 * NOTE_PADDING,
        ),
        Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => {
            let layout = fit_label(b);
            (
                label_position(b),
                layout.font_size,
                layout.line_height,
                label_inner_size(b).0,
            )
        }
        Element::Text(t) => {
            let layout = text_layout(t);
            (
                Point::new(t.x, t.y + t.font_size),
                t.font_size,
                layout.line_height,
                t.w,
            )
        }
        Element::Stroke(_) | Element::Arrow(_) => return None,
    };

    let lines = word_wrap(&prefix, font_size, max_width);
    let row = lines.len().saturating_sub(1);
    let last = lines.last().map(String::as_str).unwrap_or("");
    let x = origin.x + measure_text(last, font_size);
    let baseline = origin.y + row as f64 * line_height;
    Some(Rect::new(
        x,
        baseline - font_size,
        x + 1.5,
        baseline + font_size * 0.25,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;
    use sphereboard_core::elements::{Note, TextBox};

    fn line_count(path: &BezPath) -> usize {
        path.elements()
            .iter()
            .filter(|el| matches!(el, PathEl::MoveTo(_)))
            .count()
    }

    #[test]
    fn test_grid_threshold() {
        assert!(grid_visible(1.0));
        assert!(grid_visible(0.51));
        assert!(!grid_visible(0.5));
        assert!(!grid_visible(0.2));
    }

    #[test]
    fn test_grid_path_covers_view() {
        let path = grid_path(Rect::new(0.0, 0.0, 64.0, 32.0), GRID_SIZE);
        // x = 0, 32, 64 and y = 0, 32
        assert_eq!(line_count(&path), 5);
        let bounds = path.bounding_box();
        assert!(bounds.x0 <= 0.0 && bounds.x1 >= 64.0);
    }

    #[test]
    fn test_arrowhead_points_back_along_shaft() {
        let (left, right) = arrowhead(Point::ZERO, Point::new(100.0, 0.0)).unwrap();
        assert!(left.x < 100.0 && right.x < 100.0);
        assert!((left.y + right.y).abs() < 1e-9);
        assert!(((Point::new(100.0, 0.0) - left).hypot() - ARROW_HEAD_LENGTH).abs() < 1e-9);
        assert!(arrowhead(Point::ZERO, Point::ZERO).is_none());
    }

    #[test]
    fn test_diamond_uses_edge_midpoints() {
        let shape = BoxShape::new(0.0, 0.0, 100.0, 60.0, "#2563eb");
        let path = box_outline(BoxKind::Diamond, &shape);
        match path.elements()[0] {
            PathEl::MoveTo(p) => assert_eq!(p, Point::new(50.0, 0.0)),
            ref other => panic!("unexpected first element {:?}", other),
        }
        assert_eq!(path.bounding_box(), shape.rect());
    }

    #[test]
    fn test_single_point_stroke_is_drawable() {
        let path = stroke_path(&[Point::new(5.0, 5.0)]);
        assert_eq!(path.elements().len(), 2);
        assert!(stroke_path(&[]).elements().is_empty());
    }

    #[test]
    fn test_empty_note_shows_placeholder() {
        let note = Element::Note(Note {
            id: Default::default(),
            x: 10.0,
            y: 10.0,
            w: 220.0,
            h: None,
            text: String::new(),
        });
        let runs = text_runs(&note);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Note");
        assert_eq!(runs[0].origin, Point::new(22.0, 30.0));
    }

    #[test]
    fn test_unlabeled_shape_has_no_text() {
        let shape = BoxShape::new(0.0, 0.0, 100.0, 60.0, "#2563eb");
        assert!(text_runs(&Element::Rect(shape)).is_empty());
    }

    #[test]
    fn test_caret_advances_with_text() {
        let text = Element::Text(TextBox {
            id: Default::default(),
            x: 0.0,
            y: 0.0,
            w: 260.0,
            text: "hello".into(),
            color: DEFAULT_TEXT_COLOR.into(),
            font_size: 18.0,
        });
        let start = caret_rect(&text, 0).unwrap();
        let end = caret_rect(&text, 5).unwrap();
        assert_eq!(start.x0, 0.0);
        assert!(end.x0 > start.x0);
        assert_eq!(start.y0, end.y0);

        let stroke = Element::Stroke(sphereboard_core::elements::Stroke {
            id: Default::default(),
            color: "#000".into(),
            width: 3.0,
            points: vec![Point::ZERO],
        });
        assert!(caret_rect(&stroke, 0).is_none());
    }
}
