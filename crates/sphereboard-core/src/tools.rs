//! Tool system for the whiteboard.

use crate::color::PALETTE;
use crate::elements::{BoxKind, DEFAULT_COLOR, DEFAULT_STROKE_WIDTH};
use serde::{Deserialize, Serialize};

/// Smallest pen size.
pub const MIN_STROKE_SIZE: f64 = 1.0;
/// Largest pen size.
pub const MAX_STROKE_SIZE: f64 = 14.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Pen,
    Note,
    Rect,
    Ellipse,
    Diamond,
    Arrow,
    Text,
    Eraser,
}

impl ToolKind {
    /// All tools in toolbar order.
    pub const ALL: [ToolKind; 9] = [
        ToolKind::Select,
        ToolKind::Pen,
        ToolKind::Note,
        ToolKind::Rect,
        ToolKind::Ellipse,
        ToolKind::Diamond,
        ToolKind::Arrow,
        ToolKind::Text,
        ToolKind::Eraser,
    ];

    /// Shape kind created by a drag with this tool, if any.
    pub fn box_kind(self) -> Option<BoxKind> {
        match self {
            ToolKind::Rect => Some(BoxKind::Rect),
            ToolKind::Ellipse => Some(BoxKind::Ellipse),
            ToolKind::Diamond => Some(BoxKind::Diamond),
            _ => None,
        }
    }
}

/// Draw settings shared by the creation tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Current tool.
    pub tool: ToolKind,
    /// Draw color as a CSS string.
    pub color: String,
    /// Pen width.
    pub size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: ToolKind::Select,
            color: DEFAULT_COLOR.to_string(),
            size: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl ToolSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    /// Pick a palette color. Returns false for colors outside the palette.
    pub fn set_color(&mut self, color: &str) -> bool {
        if !PALETTE.contains(&color) {
            return false;
        }
        self.color = color.to_string();
        true
    }

    /// Set pen size, clamped to the slider range.
    pub fn set_size(&mut self, size: f64) {
        self.size = size.round().clamp(MIN_STROKE_SIZE, MAX_STROKE_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ToolSettings::new();
        assert_eq!(settings.tool, ToolKind::Select);
        assert_eq!(settings.color, "#2563eb");
        assert_eq!(settings.size, 3.0);
    }

    #[test]
    fn test_palette_only() {
        let mut settings = ToolSettings::new();
        assert!(settings.set_color("#ef4444"));
        assert_eq!(settings.color, "#ef4444");
        assert!(!settings.set_color("#123456"));
        assert_eq!(settings.color, "#ef4444");
    }

    #[test]
    fn test_size_clamp() {
        let mut settings = ToolSettings::new();
        settings.set_size(40.0);
        assert_eq!(settings.size, MAX_STROKE_SIZE);
        settings.set_size(0.2);
        assert_eq!(settings.size, MIN_STROKE_SIZE);
    }

    #[test]
    fn test_box_kinds() {
        assert_eq!(ToolKind::Diamond.box_kind(), Some(BoxKind::Diamond));
        assert_eq!(ToolKind::Pen.box_kind(), None);
        assert_eq!(ToolKind::ALL.len(), 9);
    }
}
