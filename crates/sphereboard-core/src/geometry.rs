//! Geometry kernel: bounds, anchors, arrow resolution and hit testing.

use crate::elements::{Anchor, Arrow, Element, ElementId, Endpoint};
use crate::layout::{note_rect, text_rect};
use crate::scene::Scene;
use kurbo::{Point, Rect};

/// Hit padding in screen pixels for general picking.
pub const HIT_PAD_DEFAULT_PX: f64 = 8.0;
/// Hit padding in screen pixels while placing arrow ends.
pub const HIT_PAD_ARROW_PX: f64 = 2.0;

/// Picking tolerance profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitMode {
    #[default]
    Default,
    /// Narrow padding used by the arrow tool so ends can be placed near elements.
    Arrow,
}

impl HitMode {
    /// Padding in screen pixels.
    pub fn pad_px(self) -> f64 {
        match self {
            HitMode::Default => HIT_PAD_DEFAULT_PX,
            HitMode::Arrow => HIT_PAD_ARROW_PX,
        }
    }
}

/// Minimum distance from a point to a line segment.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline. A single point counts as a dot.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (point - *only).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Box of an element that can host anchors (notes, shapes, text).
pub fn anchor_box(element: &Element) -> Option<Rect> {
    match element {
        Element::Note(n) => Some(note_rect(n)),
        Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => Some(b.rect()),
        Element::Text(t) => Some(text_rect(t)),
        Element::Stroke(_) | Element::Arrow(_) => None,
    }
}

/// World bounds of any element.
pub fn element_bounds(element: &Element, scene: &Scene) -> Rect {
    match element {
        Element::Stroke(s) => {
            let mut iter = s.points.iter();
            let Some(first) = iter.next() else {
                return Rect::ZERO;
            };
            let rect = iter.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p));
            rect.inflate(s.width / 2.0, s.width / 2.0)
        }
        Element::Arrow(a) => {
            let (from, to) = resolve_arrow_endpoints(a, scene);
            Rect::from_points(from, to)
        }
        _ => anchor_box(element).unwrap_or(Rect::ZERO),
    }
}

/// Position of an anchor on a box.
pub fn anchor_on_rect(rect: Rect, anchor: Anchor) -> Point {
    let c = rect.center();
    match anchor {
        Anchor::North => Point::new(c.x, rect.y0),
        Anchor::South => Point::new(c.x, rect.y1),
        Anchor::East => Point::new(rect.x1, c.y),
        Anchor::West => Point::new(rect.x0, c.y),
        Anchor::Center => c,
    }
}

/// The five anchors (n, s, e, w, c) of an element, if it can host them.
pub fn anchors_of(element: &Element) -> Option<[(Anchor, Point); 5]> {
    let rect = anchor_box(element)?;
    Some(Anchor::ALL.map(|a| (a, anchor_on_rect(rect, a))))
}

/// Anchor closest to `point`. Ties resolve in n, s, e, w, c order.
pub fn closest_anchor(element: &Element, point: Point) -> Option<Anchor> {
    let anchors = anchors_of(element)?;
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for (anchor, pos) in anchors {
        let d = (pos - point).hypot2();
        if d < best_dist {
            best_dist = d;
            best = Some(anchor);
        }
    }
    best
}

/// Resolve an arrow end to a world point.
///
/// Bound ends follow their target's anchor; a missing target falls back to the last
/// resolved coordinate carried by the binding.
pub fn resolve_endpoint(endpoint: &Endpoint, scene: &Scene) -> Point {
    match endpoint {
        Endpoint::Free(p) => *p,
        Endpoint::Bound(b) => scene
            .get(&b.el_id)
            .and_then(anchor_box)
            .map(|rect| anchor_on_rect(rect, b.anchor))
            .or(b.last)
            .unwrap_or(Point::ZERO),
    }
}

/// Resolve both arrow ends.
pub fn resolve_arrow_endpoints(arrow: &Arrow, scene: &Scene) -> (Point, Point) {
    (
        resolve_endpoint(&arrow.from, scene),
        resolve_endpoint(&arrow.to, scene),
    )
}

/// Build an arrow end at `point`: bound to the closest anchor of `target` when it
/// has anchors, otherwise a free point.
pub fn endpoint_at(point: Point, target: Option<&Element>) -> Endpoint {
    target
        .and_then(|el| {
            let rect = anchor_box(el)?;
            let anchor = closest_anchor(el, point)?;
            Some(Endpoint::bound(el.id().clone(), anchor, anchor_on_rect(rect, anchor)))
        })
        .unwrap_or(Endpoint::Free(point))
}

/// Whether `point` is on `element` within `pad` world units.
pub fn hit_element(element: &Element, point: Point, pad: f64, scene: &Scene) -> bool {
    match element {
        Element::Stroke(s) => point_to_polyline_dist(point, &s.points) <= s.width + pad,
        Element::Arrow(a) => {
            let (from, to) = resolve_arrow_endpoints(a, scene);
            point_to_segment_dist(point, from, to) <= pad
        }
        _ => anchor_box(element)
            .map(|r| r.inflate(pad, pad).contains(point))
            .unwrap_or(false),
    }
}

/// Topmost element under a world point.
///
/// Elements are tested in reverse insertion order; padding is given in screen pixels
/// and divided by `scale`.
pub fn hit_test(point: Point, scene: &Scene, scale: f64, mode: HitMode) -> Option<ElementId> {
    let pad = mode.pad_px() / scale;
    scene
        .iter()
        .rev()
        .find(|el| hit_element(el, point, pad, scene))
        .map(|el| el.id().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{BoxShape, Stroke, DEFAULT_COLOR};
    use kurbo::Vec2;

    fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Element {
        let mut shape = BoxShape::new(x, y, w, h, DEFAULT_COLOR);
        shape.id = ElementId::from(id);
        Element::Rect(shape)
    }

    fn arrow(id: &str, from: Endpoint, to: Endpoint) -> Element {
        Element::Arrow(Arrow {
            id: ElementId::from(id),
            from,
            to,
            color: DEFAULT_COLOR.to_string(),
        })
    }

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((point_to_segment_dist(Point::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-9);
        assert!((point_to_segment_dist(Point::new(1.0, 1.0), a, a) - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_hit_rect() {
        let scene = Scene::from_elements([rect("r", 100.0, 100.0, 200.0, 100.0)]);
        let r = Some(ElementId::from("r"));
        assert_eq!(hit_test(Point::new(150.0, 140.0), &scene, 1.0, HitMode::Default), r);
        assert_eq!(hit_test(Point::new(50.0, 50.0), &scene, 1.0, HitMode::Default), None);
        // Just inside the padding beyond the corner
        assert_eq!(hit_test(Point::new(93.0, 93.0), &scene, 1.0, HitMode::Default), r);
        assert_eq!(hit_test(Point::new(93.0, 93.0), &scene, 1.0, HitMode::Arrow), None);
    }

    #[test]
    fn test_hit_padding_scales_with_zoom() {
        let scene = Scene::from_elements([rect("r", 0.0, 0.0, 10.0, 10.0)]);
        // 8px at scale 4 is 2 world units
        assert!(hit_test(Point::new(11.5, 5.0), &scene, 4.0, HitMode::Default).is_some());
        assert!(hit_test(Point::new(12.5, 5.0), &scene, 4.0, HitMode::Default).is_none());
    }

    #[test]
    fn test_hit_topmost_first() {
        let scene = Scene::from_elements([
            rect("bottom", 0.0, 0.0, 100.0, 100.0),
            rect("top", 50.0, 50.0, 100.0, 100.0),
        ]);
        assert_eq!(
            hit_test(Point::new(75.0, 75.0), &scene, 1.0, HitMode::Default),
            Some(ElementId::from("top"))
        );
        assert_eq!(
            hit_test(Point::new(25.0, 25.0), &scene, 1.0, HitMode::Default),
            Some(ElementId::from("bottom"))
        );
    }

    #[test]
    fn test_hit_stroke_and_arrow() {
        let stroke = Element::Stroke(Stroke {
            id: ElementId::from("s"),
            color: DEFAULT_COLOR.to_string(),
            width: 3.0,
            points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
        });
        let arrow = arrow(
            "a",
            Endpoint::Free(Point::new(0.0, 200.0)),
            Endpoint::Free(Point::new(100.0, 200.0)),
        );
        let scene = Scene::from_elements([stroke, arrow]);
        assert_eq!(
            hit_test(Point::new(50.0, 10.0), &scene, 1.0, HitMode::Default),
            Some(ElementId::from("s"))
        );
        assert_eq!(hit_test(Point::new(50.0, 12.0), &scene, 1.0, HitMode::Default), None);
        assert_eq!(
            hit_test(Point::new(50.0, 207.0), &scene, 1.0, HitMode::Default),
            Some(ElementId::from("a"))
        );
        assert_eq!(hit_test(Point::new(50.0, 203.0), &scene, 1.0, HitMode::Arrow), None);
    }

    #[test]
    fn test_anchors_and_closest() {
        let el = rect("r", 0.0, 0.0, 100.0, 50.0);
        let anchors = anchors_of(&el).unwrap();
        assert_eq!(anchors[0], (Anchor::North, Point::new(50.0, 0.0)));
        assert_eq!(anchors[2], (Anchor::East, Point::new(100.0, 25.0)));
        assert_eq!(anchors[4], (Anchor::Center, Point::new(50.0, 25.0)));
        assert_eq!(closest_anchor(&el, Point::new(95.0, 20.0)), Some(Anchor::East));
        assert_eq!(closest_anchor(&el, Point::new(48.0, 30.0)), Some(Anchor::Center));
    }

    #[test]
    fn test_bound_arrow_follows_target() {
        let mut scene = Scene::from_elements([
            rect("a", 0.0, 0.0, 100.0, 50.0),
            arrow(
                "arr",
                Endpoint::bound(ElementId::from("a"), Anchor::East, Point::ZERO),
                Endpoint::Free(Point::new(300.0, 300.0)),
            ),
        ]);
        let Some(Element::Arrow(arr)) = scene.get(&ElementId::from("arr")).cloned() else {
            panic!("missing arrow");
        };
        let (before, _) = resolve_arrow_endpoints(&arr, &scene);

        let (dx, dy) = (37.0, -12.5);
        let mut moved = scene.get(&ElementId::from("a")).cloned().unwrap();
        moved.translate(Vec2::new(dx, dy));
        scene.replace(moved);

        let (after, _) = resolve_arrow_endpoints(&arr, &scene);
        assert!((after.x - before.x - dx).abs() < 1e-9);
        assert!((after.y - before.y - dy).abs() < 1e-9);
    }

    #[test]
    fn test_missing_target_uses_last_known() {
        let scene = Scene::new();
        let end = Endpoint::bound(ElementId::from("gone"), Anchor::North, Point::new(7.0, 8.0));
        assert_eq!(resolve_endpoint(&end, &scene), Point::new(7.0, 8.0));
    }

    #[test]
    fn test_endpoint_at() {
        let el = rect("r", 0.0, 0.0, 100.0, 50.0);
        let end = endpoint_at(Point::new(2.0, 24.0), Some(&el));
        assert_eq!(end.target(), Some(&ElementId::from("r")));
        let Endpoint::Bound(b) = end else { unreachable!() };
        assert_eq!(b.anchor, Anchor::West);
        assert_eq!(b.last, Some(Point::new(0.0, 25.0)));

        let free = endpoint_at(Point::new(2.0, 24.0), None);
        assert_eq!(free, Endpoint::Free(Point::new(2.0, 24.0)));
    }
}
