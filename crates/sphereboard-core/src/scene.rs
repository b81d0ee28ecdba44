//! Scene store: the ordered element list of one board.

use crate::elements::{Element, ElementId, Endpoint};
use crate::geometry::resolve_endpoint;
use std::collections::HashMap;

/// In-memory element store for a single board.
///
/// Elements live in an arena keyed by id; `z_order` holds insertion order, which is
/// also paint order (later elements are drawn on top and hit first).
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// All elements, keyed by ID.
    elements: HashMap<ElementId, Element>,
    /// Z-order of elements (back to front).
    z_order: Vec<ElementId>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from an ordered list. Later duplicates replace earlier ones.
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut scene = Self::new();
        scene.load(elements);
        scene
    }

    /// Replace the whole content with `elements`.
    pub fn load(&mut self, elements: impl IntoIterator<Item = Element>) {
        self.clear();
        for element in elements {
            self.append(element);
        }
    }

    /// Add an element on top.
    ///
    /// An element whose id is already present replaces the existing one in place.
    /// Returns true if the element was new.
    pub fn append(&mut self, element: Element) -> bool {
        let id = element.id().clone();
        if self.elements.insert(id.clone(), element).is_some() {
            return false;
        }
        self.z_order.push(id);
        true
    }

    /// Replace an existing element with the same id.
    ///
    /// Returns the previous element, or `None` (and leaves the scene untouched) when
    /// the id is unknown.
    pub fn replace(&mut self, element: Element) -> Option<Element> {
        let slot = self.elements.get_mut(element.id())?;
        Some(std::mem::replace(slot, element))
    }

    /// Remove an element.
    ///
    /// Arrow ends bound to the removed element are frozen at their last resolved
    /// position instead of being removed.
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        if !self.elements.contains_key(id) {
            return None;
        }
        self.freeze_bindings_to(id);
        self.z_order.retain(|z| z != id);
        self.elements.remove(id)
    }

    /// Remove all elements. Clearing an empty scene is a no-op.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.z_order.clear();
    }

    /// Get an element by id.
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Iterate elements back to front.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Element> {
        self.z_order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Snapshot of all elements in z-order.
    pub fn all(&self) -> Vec<Element> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.z_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_order.is_empty()
    }

    fn freeze_bindings_to(&mut self, id: &ElementId) {
        let mut frozen = Vec::new();
        for element in self.iter() {
            let Element::Arrow(arrow) = element else {
                continue;
            };
            let from = arrow.from.target() == Some(id);
            let to = arrow.to.target() == Some(id);
            if !from && !to {
                continue;
            }
            let mut arrow = arrow.clone();
            if from {
                arrow.from = Endpoint::Free(resolve_endpoint(&arrow.from, self));
            }
            if to {
                arrow.to = Endpoint::Free(resolve_endpoint(&arrow.to, self));
            }
            frozen.push(Element::Arrow(arrow));
        }
        for arrow in frozen {
            log::debug!("Freezing arrow {} bound to removed element {}", arrow.id(), id);
            self.replace(arrow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Anchor, Arrow, BoxShape, Note};
    use kurbo::Point;

    fn rect(id: &str, x: f64, y: f64) -> Element {
        let mut shape = BoxShape::new(x, y, 100.0, 50.0, "#2563eb");
        shape.id = ElementId::from(id);
        Element::Rect(shape)
    }

    fn ids(scene: &Scene) -> Vec<String> {
        scene.iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn test_append_preserves_order() {
        let mut scene = Scene::new();
        assert!(scene.append(rect("a", 0.0, 0.0)));
        assert!(scene.append(rect("b", 0.0, 0.0)));
        assert!(scene.append(rect("c", 0.0, 0.0)));
        assert_eq!(ids(&scene), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_append_existing_replaces_in_place() {
        let mut scene = Scene::new();
        scene.append(rect("a", 0.0, 0.0));
        scene.append(rect("b", 0.0, 0.0));
        assert!(!scene.append(rect("a", 5.0, 5.0)));
        assert_eq!(ids(&scene), vec!["a", "b"]);
        let Some(Element::Rect(r)) = scene.get(&ElementId::from("a")) else {
            panic!("missing rect");
        };
        assert_eq!(r.x, 5.0);
    }

    #[test]
    fn test_replace_unknown_is_noop() {
        let mut scene = Scene::new();
        assert!(scene.replace(rect("ghost", 0.0, 0.0)).is_none());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut scene = Scene::from_elements([rect("a", 0.0, 0.0), rect("b", 0.0, 0.0)]);
        assert!(scene.remove(&ElementId::from("a")).is_some());
        assert!(scene.remove(&ElementId::from("a")).is_none());
        assert_eq!(ids(&scene), vec!["b"]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut scene = Scene::from_elements([rect("a", 0.0, 0.0)]);
        scene.clear();
        scene.clear();
        assert!(scene.is_empty());
        assert_eq!(scene.len(), 0);
    }

    #[test]
    fn test_remove_freezes_bound_arrow() {
        let arrow = Element::Arrow(Arrow {
            id: ElementId::from("arrow"),
            from: Endpoint::bound(ElementId::from("a"), Anchor::East, Point::ZERO),
            to: Endpoint::Free(Point::new(400.0, 400.0)),
            color: "#111827".to_string(),
        });
        let mut scene = Scene::from_elements([rect("a", 0.0, 0.0), arrow]);
        scene.remove(&ElementId::from("a"));

        assert_eq!(scene.len(), 1);
        let Some(Element::Arrow(arrow)) = scene.get(&ElementId::from("arrow")) else {
            panic!("arrow should survive");
        };
        // East anchor of (0, 0, 100, 50)
        assert_eq!(arrow.from, Endpoint::Free(Point::new(100.0, 25.0)));
    }

    #[test]
    fn test_load_dedupes() {
        let note = Element::Note(Note {
            id: ElementId::from("n"),
            x: 0.0,
            y: 0.0,
            w: 220.0,
            h: None,
            text: "first".to_string(),
        });
        let mut later = note.clone();
        later.set_text_content("second".to_string());
        let scene = Scene::from_elements([note, rect("r", 0.0, 0.0), later]);
        assert_eq!(ids(&scene), vec!["n", "r"]);
        assert_eq!(
            scene.get(&ElementId::from("n")).and_then(|e| e.text_content()),
            Some("second")
        );
    }
}
