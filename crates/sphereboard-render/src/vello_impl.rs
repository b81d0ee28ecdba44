//! Vello-based renderer implementation.

use crate::paths::{
    GRID_SIZE, NOTE_RADIUS, TEXT_WEIGHT, TextRun, arrow_path, box_outline, caret_rect, grid_path,
    grid_visible, stroke_path, text_runs,
};
use crate::renderer::{ElementRenderer, RenderContext, Renderer};
use kurbo::{Affine, Cap, Join, Point, Rect, RoundedRect, Shape as KurboShape, Stroke};
use parley::layout::PositionedLayoutItem;
use parley::{
    FontContext, FontFamily, FontStack, GenericFamily, Layout, LayoutContext, StyleProperty,
};
use peniko::{Brush, Color, Fill, Gradient};
use sphereboard_core::color::{NOTE_BACKGROUND, parse_css_color};
use sphereboard_core::elements::Element;
use sphereboard_core::geometry::{element_bounds, resolve_arrow_endpoints};
use sphereboard_core::layout::note_rect;
use sphereboard_core::presence::RemoteCursor;
use sphereboard_core::scene::Scene as Board;
use sphereboard_core::selection::{HANDLE_SIZE, get_handles};
use vello::Scene;

const SHAPE_FILL: Color = Color::from_rgba8(255, 255, 255, 204);
const HOVER_GLOW: Color = Color::from_rgba8(37, 99, 235, 77);
const CARD_SHADOW: Color = Color::from_rgba8(15, 23, 42, 26);
const GRID_COLOR: Color = Color::from_rgba8(241, 245, 249, 255);
const HANDLE_COLOR: Color = Color::from_rgba8(37, 99, 235, 255);
const CARET_COLOR: Color = Color::from_rgba8(17, 24, 39, 255);
const CURSOR_LABEL_BG: Color = Color::from_rgba8(17, 24, 39, 230);
const CURSOR_LABEL_FONT_SIZE: f64 = 11.0;
const CURSOR_LABEL_PAD: f64 = 6.0;
const CURSOR_DOT_RADIUS: f64 = 5.0;

/// Vello-based renderer for GPU-accelerated 2D graphics.
pub struct VelloRenderer {
    /// The Vello scene being built.
    scene: Scene,
    /// Selection highlight color.
    selection_color: Color,
    /// Font context for text rendering, kept across frames.
    font_cx: FontContext,
    /// Layout context for text rendering.
    layout_cx: LayoutContext<Brush>,
    /// Current zoom level (for zoom-independent UI elements).
    zoom: f64,
}

impl Default for VelloRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloRenderer {
    /// Create a new Vello renderer using the system sans-serif font.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            selection_color: Color::from_rgba8(37, 99, 235, 230),
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            zoom: 1.0,
        }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Shape a single line of text.
    fn layout_line(&mut self, text: &str, font_size: f64, weight: f32, color: Color) -> Layout<Brush> {
        let mut builder = self.layout_cx.ranged_builder(&mut self.font_cx, text, 1.0, false);
        builder.push_default(StyleProperty::FontStack(FontStack::Single(
            FontFamily::Generic(GenericFamily::SansSerif),
        )));
        builder.push_default(StyleProperty::FontSize(font_size as f32));
        builder.push_default(StyleProperty::FontWeight(parley::FontWeight::new(weight)));
        builder.push_default(StyleProperty::Brush(Brush::Solid(color)));
        let mut layout = builder.build(text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());
        layout
    }

    /// Draw a shaped line with its baseline starting at `origin`. Returns the glyph count.
    fn draw_layout(&mut self, layout: &Layout<Brush>, origin: Point, transform: Affine) -> usize {
        let mut glyph_count = 0;
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let glyph_style = glyph_run.style();
                let mut x = glyph_run.offset();
                let baseline = glyph_run.baseline();
                let run = glyph_run.run();
                let font = run.font();
                let font_size = run.font_size();
                let synthesis = run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = baseline - glyph.y;
                        x += glyph.advance;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();

                glyph_count += glyphs.len();
                if !glyphs.is_empty() {
                    // Glyphs are laid out from the layout top; shift so the baseline lands on origin.
                    let text_transform = transform
                        * Affine::translate((origin.x, origin.y - baseline as f64));
                    self.scene
                        .draw_glyphs(font)
                        .brush(&glyph_style.brush)
                        .hint(true)
                        .transform(text_transform)
                        .glyph_transform(glyph_xform)
                        .font_size(font_size)
                        .normalized_coords(run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }
        glyph_count
    }

    fn render_text_runs(&mut self, runs: Vec<TextRun>, transform: Affine) {
        for run in runs {
            let layout = self.layout_line(&run.text, run.font_size, TEXT_WEIGHT, run.color);
            if self.draw_layout(&layout, run.origin, transform) == 0 && !run.text.trim().is_empty() {
                log::debug!("no glyphs shaped for {:?}, is a sans-serif font installed?", run.text);
            }
        }
    }

    /// Vertical background wash over the viewport.
    fn render_background(&mut self, ctx: &RenderContext) {
        let size = ctx.viewport_size;
        let rect = Rect::new(0.0, 0.0, size.width, size.height);
        let gradient = Gradient::new_linear((0.0, 0.0), (0.0, size.height))
            .with_stops([Color::WHITE, ctx.background_color]);
        self.scene
            .fill(Fill::NonZero, ctx.device_transform(), &gradient, None, &rect);
    }

    fn render_hover_glow(&mut self, bounds: Rect, transform: Affine) {
        self.scene
            .draw_blurred_rounded_rect(transform, bounds, HOVER_GLOW, 8.0, 4.0);
    }

    fn render_note(&mut self, element: &Element, rect: Rect, transform: Affine, shadow: bool) {
        if shadow {
            self.scene.draw_blurred_rounded_rect(
                transform,
                rect + kurbo::Vec2::new(0.0, 2.0),
                CARD_SHADOW,
                NOTE_RADIUS,
                5.0,
            );
        }
        let card = RoundedRect::from_rect(rect, NOTE_RADIUS);
        self.scene.fill(
            Fill::NonZero,
            transform,
            parse_css_color(NOTE_BACKGROUND),
            None,
            &card,
        );
        self.render_text_runs(text_runs(element), transform);
    }

    /// Inline edit preview plus its caret.
    fn render_editing(&mut self, ctx: &RenderContext, transform: Affine) {
        let Some(view) = ctx.editing.as_ref() else {
            return;
        };
        self.render_element(&view.element, ctx.board, transform, false);
        if let Some(caret) = caret_rect(&view.element, view.caret) {
            self.scene
                .fill(Fill::NonZero, transform, CARET_COLOR, None, &caret);
        }
    }

    /// Dot and name tag for a remote participant, in screen space.
    fn render_cursor(&mut self, cursor: &RemoteCursor, ctx: &RenderContext) {
        let transform = ctx.device_transform();
        let pos = cursor.screen_position(ctx.viewport_size);
        let color = parse_css_color(&cursor.color);

        let dot = kurbo::Circle::new(pos, CURSOR_DOT_RADIUS);
        self.scene.draw_blurred_rounded_rect(
            transform,
            dot.bounding_box(),
            Color::from_rgba8(0, 0, 0, 60),
            CURSOR_DOT_RADIUS,
            2.0,
        );
        self.scene.fill(Fill::NonZero, transform, color, None, &dot);

        let label = cursor.label();
        if label.is_empty() {
            return;
        }
        let layout = self.layout_line(label, CURSOR_LABEL_FONT_SIZE, 700.0, Color::WHITE);
        let width = layout.width() as f64 + CURSOR_LABEL_PAD * 2.0;
        let tag = Rect::new(pos.x + 10.0, pos.y - 10.0, pos.x + 10.0 + width, pos.y + 10.0);
        self.scene.fill(
            Fill::NonZero,
            transform,
            CURSOR_LABEL_BG,
            None,
            &RoundedRect::from_rect(tag, 6.0),
        );
        self.draw_layout(
            &layout,
            Point::new(pos.x + 10.0 + CURSOR_LABEL_PAD, pos.y + 4.0),
            transform,
        );
    }
}

impl Renderer for VelloRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        // Clear the scene
        self.scene.reset();
        self.selection_color = ctx.selection_color;
        self.zoom = ctx.camera.scale;

        let view = ctx.view_transform();

        self.render_background(ctx);
        if ctx.show_grid && grid_visible(ctx.camera.scale) {
            self.render_grid(ctx.visible_world(), view, GRID_SIZE);
        }

        // Elements in z-order; the one being edited is drawn from the edit preview.
        for element in ctx.board.iter() {
            if ctx.is_being_edited(element.id()) {
                continue;
            }
            let hovered = ctx.hovered == Some(element.id()) && ctx.selected != Some(element.id());
            self.render_element(element, ctx.board, view, hovered);
        }

        if let Some(draft) = ctx.draft {
            self.render_element(draft, ctx.board, view, false);
        }

        if let Some(selected) = ctx.selected.and_then(|id| ctx.board.get(id)) {
            if !ctx.is_being_edited(selected.id()) {
                self.render_selection(selected, ctx.board, view);
            }
        }

        self.render_editing(ctx, view);

        for cursor in &ctx.cursors {
            self.render_cursor(cursor, ctx);
        }
    }
}

impl ElementRenderer for VelloRenderer {
    fn render_element(&mut self, element: &Element, board: &Board, transform: Affine, hovered: bool) {
        if hovered {
            self.render_hover_glow(element_bounds(element, board), transform);
        }
        let line_width = if hovered { 3.0 } else { 2.0 };

        match element {
            Element::Stroke(s) => {
                let stroke = Stroke::new(s.width)
                    .with_caps(Cap::Round)
                    .with_join(Join::Round);
                self.scene.stroke(
                    &stroke,
                    transform,
                    parse_css_color(&s.color),
                    None,
                    &stroke_path(&s.points),
                );
            }
            Element::Note(n) => {
                self.render_note(element, note_rect(n), transform, !hovered);
            }
            Element::Rect(b) | Element::Ellipse(b) | Element::Diamond(b) => {
                let Some((kind, _)) = element.as_box() else {
                    return;
                };
                let path = box_outline(kind, b);
                self.scene
                    .fill(Fill::NonZero, transform, SHAPE_FILL, None, &path);
                self.scene.stroke(
                    &Stroke::new(line_width).with_join(Join::Round),
                    transform,
                    parse_css_color(&b.color),
                    None,
                    &path,
                );
                self.render_text_runs(text_runs(element), transform);
            }
            Element::Arrow(a) => {
                let (from, to) = resolve_arrow_endpoints(a, board);
                let stroke = Stroke::new(line_width)
                    .with_caps(Cap::Round)
                    .with_join(Join::Round);
                self.scene.stroke(
                    &stroke,
                    transform,
                    parse_css_color(&a.color),
                    None,
                    &arrow_path(from, to),
                );
            }
            Element::Text(_) => {
                self.render_text_runs(text_runs(element), transform);
            }
        }
    }

    fn render_grid(&mut self, world: Rect, transform: Affine, grid_size: f64) {
        let path = grid_path(world, grid_size);
        self.scene
            .stroke(&Stroke::new(0.5), transform, GRID_COLOR, None, &path);
    }

    /// Dashed outline plus resize handles.
    /// Dash, width and handle size are scaled inversely with zoom.
    fn render_selection(&mut self, element: &Element, board: &Board, transform: Affine) {
        let bounds = element_bounds(element, board);
        let stroke_width = 2.0 / self.zoom;
        let dash = 8.0 / self.zoom;
        let gap = 4.0 / self.zoom;
        let stroke = Stroke::new(stroke_width).with_dashes(0.0, &[dash, gap]);
        self.scene.stroke(
            &stroke,
            transform,
            self.selection_color,
            None,
            &bounds.to_path(0.1),
        );

        let half = HANDLE_SIZE / self.zoom / 2.0;
        for handle in get_handles(element) {
            let pos = handle.position;
            let square = Rect::new(pos.x - half, pos.y - half, pos.x + half, pos.y + half);
            self.scene
                .fill(Fill::NonZero, transform, HANDLE_COLOR, None, &square);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use sphereboard_core::camera::Camera;
    use sphereboard_core::elements::{BoxShape, ElementId};
    use sphereboard_core::presence::RemoteCursor;
    use std::time::Instant;

    fn board_with_rect() -> (Board, ElementId) {
        let mut board = Board::new();
        let mut shape = BoxShape::new(100.0, 100.0, 200.0, 150.0, "#2563eb");
        shape.label = "Plan".into();
        let id = shape.id.clone();
        board.append(Element::Rect(shape));
        (board, id)
    }

    #[test]
    fn test_renderer_creation() {
        let renderer = VelloRenderer::new();
        assert!(renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_build_empty_scene() {
        let mut renderer = VelloRenderer::new();
        let board = Board::new();
        let camera = Camera::new();
        let ctx = RenderContext::new(&board, &camera, Size::new(800.0, 600.0));

        renderer.build_scene(&ctx);
        // Background and grid at minimum
        assert!(!renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_build_scene_with_selection_and_cursor() {
        let mut renderer = VelloRenderer::new();
        let (board, id) = board_with_rect();
        let camera = Camera::new();
        let cursor = RemoteCursor {
            participant_id: "p2".into(),
            x: 0.5,
            y: 0.5,
            name: "ada@example.com".into(),
            color: "hsl(200 85% 55%)".into(),
            received: Instant::now(),
        };
        let ctx = RenderContext::new(&board, &camera, Size::new(800.0, 600.0))
            .with_selected(Some(&id))
            .with_cursors(vec![&cursor]);
        renderer.build_scene(&ctx);
        assert!(!renderer.scene().encoding().is_empty());
    }

    #[test]
    fn test_take_scene_leaves_empty() {
        let mut renderer = VelloRenderer::new();
        let (board, _) = board_with_rect();
        let camera = Camera::new();
        let ctx = RenderContext::new(&board, &camera, Size::new(800.0, 600.0)).with_grid(false);
        renderer.build_scene(&ctx);
        let scene = renderer.take_scene();
        assert!(!scene.encoding().is_empty());
        assert!(renderer.scene().encoding().is_empty());
    }
}
