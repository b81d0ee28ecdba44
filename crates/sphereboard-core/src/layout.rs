//! Text measurement and box layout for notes, text blocks and shape labels.
//!
//! Widths come from a fixed per-character advance table rather than from a font
//! backend, so every peer wraps the same text into the same lines.

use crate::elements::{BoxShape, Note, TextBox};
use kurbo::{Point, Rect};

/// Line height as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.3;
/// Smallest label font size.
pub const MIN_LABEL_FONT_SIZE: f64 = 8.0;
/// Largest label font size.
pub const MAX_LABEL_FONT_SIZE: f64 = 48.0;
/// Horizontal inset of a label inside its shape (per side).
pub const LABEL_PAD_X: f64 = 8.0;
/// Vertical inset of a label inside its shape (per side).
pub const LABEL_PAD_Y: f64 = 16.0;
/// Note text inset from the card edge.
pub const NOTE_PADDING: f64 = 12.0;
/// Note text font size.
pub const NOTE_FONT_SIZE: f64 = 14.0;
/// Note text line height.
pub const NOTE_LINE_HEIGHT: f64 = 18.0;
/// Height of a note without text.
pub const EMPTY_NOTE_HEIGHT: f64 = 120.0;

const ELLIPSIS: char = '…';

/// Advance width of a character as a fraction of the font size (semibold sans).
fn char_advance(c: char) -> f64 {
    match c {
        ' ' => 0.28,
        'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.38,
        'm' | 'w' => 0.86,
        'M' | 'W' | '@' => 0.92,
        '0'..='9' => 0.58,
        c if c.is_ascii_uppercase() => 0.68,
        c if c.is_ascii() => 0.56,
        // CJK and other wide scripts
        c if c as u32 >= 0x2E80 => 1.0,
        _ => 0.6,
    }
}

/// Measured width of a single line of text.
pub fn measure_text(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_advance).sum::<f64>() * font_size
}

/// Greedy word wrap.
///
/// Words are appended while the running line (with a trailing space) stays within
/// `max_width`; the first word of a line is never broken. Hard line breaks start a
/// new paragraph. Empty text wraps to a single empty line.
pub fn word_wrap(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for (i, word) in paragraph.split_whitespace().enumerate() {
            let test = format!("{line}{word} ");
            if i > 0 && measure_text(&test, font_size) > max_width {
                lines.push(line.trim_end().to_string());
                line = format!("{word} ");
            } else {
                line = test;
            }
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}

/// Layout of a label fitted inside a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub font_size: f64,
    pub line_height: f64,
    pub lines: Vec<String>,
}

impl LabelLayout {
    /// Total height of the laid out lines.
    pub fn height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }
}

/// Inner box available to a label: `(width, height)`.
pub fn label_inner_size(shape: &BoxShape) -> (f64, f64) {
    (
        (shape.w - 2.0 * LABEL_PAD_X).max(10.0),
        (shape.h - 2.0 * LABEL_PAD_Y).max(10.0),
    )
}

/// Find the largest font size in `[8, fontSize]` (capped at 48) whose wrapped label
/// fits the shape's inner box.
///
/// If even the smallest size overflows, lines past the inner height are dropped and
/// the last kept line ends with an ellipsis. At least one line is always kept.
pub fn fit_label(shape: &BoxShape) -> LabelLayout {
    let (inner_w, inner_h) = label_inner_size(shape);
    let base = shape
        .font_size
        .round()
        .clamp(MIN_LABEL_FONT_SIZE, MAX_LABEL_FONT_SIZE) as i64;

    let mut lo = MIN_LABEL_FONT_SIZE as i64;
    let mut hi = base;
    let mut best: Option<(f64, Vec<String>)> = None;
    while lo <= hi {
        let mid = (lo + hi) / 2;
        let fs = mid as f64;
        let lines = word_wrap(&shape.label, fs, inner_w);
        if lines.len() as f64 * fs * LINE_HEIGHT_FACTOR <= inner_h {
            best = Some((fs, lines));
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    match best {
        Some((font_size, lines)) => LabelLayout {
            font_size,
            line_height: font_size * LINE_HEIGHT_FACTOR,
            lines,
        },
        None => {
            let font_size = MIN_LABEL_FONT_SIZE;
            let line_height = font_size * LINE_HEIGHT_FACTOR;
            let mut lines = word_wrap(&shape.label, font_size, inner_w);
            let max_lines = ((inner_h / line_height).floor() as usize).max(1);
            if lines.len() > max_lines {
                lines.truncate(max_lines);
                if let Some(last) = lines.last_mut() {
                    last.push(ELLIPSIS);
                }
            }
            LabelLayout {
                font_size,
                line_height,
                lines,
            }
        }
    }
}

/// World position of the label's first baseline origin.
pub fn label_position(shape: &BoxShape) -> Point {
    Point::new(
        shape.x + LABEL_PAD_X + (shape.w - 2.0 * LABEL_PAD_X) * shape.label_fx,
        shape.y + LABEL_PAD_Y + (shape.h - 2.0 * LABEL_PAD_Y) * shape.label_fy,
    )
}

/// Label fractions that place the label at `point`, clamped to the inner box.
pub fn label_fractions_at(shape: &BoxShape, point: Point) -> (f64, f64) {
    let fx = (point.x - shape.x - LABEL_PAD_X) / (shape.w - 2.0 * LABEL_PAD_X).max(1.0);
    let fy = (point.y - shape.y - LABEL_PAD_Y) / (shape.h - 2.0 * LABEL_PAD_Y).max(1.0);
    (fx.clamp(0.0, 1.0), fy.clamp(0.0, 1.0))
}

/// Characters that fit on one note line.
fn note_chars_per_line(note: &Note) -> usize {
    (((note.w - 2.0 * NOTE_PADDING) / 7.0).floor().max(10.0)) as usize
}

/// Height of a note card derived from its text length.
pub fn note_height(note: &Note) -> f64 {
    let len = note.text.chars().count();
    let auto = if len == 0 {
        EMPTY_NOTE_HEIGHT
    } else {
        let lines = len.div_ceil(note_chars_per_line(note));
        28.0 + lines as f64 * NOTE_LINE_HEIGHT
    };
    auto.max(note.h.unwrap_or(0.0))
}

/// Lines drawn on a note card.
pub fn note_lines(note: &Note) -> Vec<String> {
    let text = if note.text.is_empty() { "Note" } else { &note.text };
    word_wrap(text, NOTE_FONT_SIZE, note.w - 2.0 * NOTE_PADDING)
}

/// World bounds of a note card.
pub fn note_rect(note: &Note) -> Rect {
    Rect::new(note.x, note.y, note.x + note.w, note.y + note_height(note))
}

/// Wrapped layout of a text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub line_height: f64,
    /// Box width and height.
    pub width: f64,
    pub height: f64,
}

/// Lay out a text block. The box top-left is the element origin and the first
/// baseline sits one font size below it.
pub fn text_layout(text: &TextBox) -> TextLayout {
    let line_height = text.font_size * LINE_HEIGHT_FACTOR;
    let lines = word_wrap(&text.text, text.font_size, text.w);
    let height = lines.len() as f64 * line_height + 8.0;
    TextLayout {
        lines,
        line_height,
        width: text.w,
        height,
    }
}

/// World bounds of a text block.
pub fn text_rect(text: &TextBox) -> Rect {
    let layout = text_layout(text);
    Rect::new(text.x, text.y, text.x + layout.width, text.y + layout.height)
}
