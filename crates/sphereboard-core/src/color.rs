//! CSS color strings used on the wire.

use peniko::Color;

/// Draw color palette offered to users.
pub const PALETTE: [&str; 9] = [
    "#111827", "#2563eb", "#06b6d4", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899",
    "#64748b",
];

/// Sticky note background.
pub const NOTE_BACKGROUND: &str = "#fef3c7";

/// Stable per-participant color derived from a numeric seed.
pub fn participant_color(seed: u64) -> String {
    let hue = seed.wrapping_mul(2_654_435_761) % 360;
    format!("hsl({} 85% 55%)", hue)
}

/// Parse a CSS color string into a render color.
///
/// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and `hsl(h s% l%)` (comma separated or not).
/// Anything else falls back to near-black ink.
pub fn parse_css_color(color: &str) -> Color {
    parse_hex(color.trim())
        .or_else(|| parse_hsl(color.trim()))
        .unwrap_or(Color::from_rgba8(17, 24, 39, 255))
}

fn parse_hex(color: &str) -> Option<Color> {
    let hex = color.strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let r = channel(&hex[0..1])? * 17;
            let g = channel(&hex[1..2])? * 17;
            let b = channel(&hex[2..3])? * 17;
            Some(Color::from_rgba8(r, g, b, 255))
        }
        6 => Some(Color::from_rgba8(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        )),
        8 => Some(Color::from_rgba8(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

fn parse_hsl(color: &str) -> Option<Color> {
    let inner = color
        .strip_prefix("hsl(")
        .or_else(|| color.strip_prefix("hsla("))?
        .strip_suffix(')')?;
    let mut parts = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    let h: f64 = parts.next()?.trim_end_matches("deg").parse().ok()?;
    let s: f64 = parts.next()?.trim_end_matches('%').parse().ok()?;
    let l: f64 = parts.next()?.trim_end_matches('%').parse().ok()?;
    let (r, g, b) = hsl_to_rgb(h, s / 100.0, l / 100.0);
    Some(Color::from_rgba8(r, g, b, 255))
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    let a = s * l.min(1.0 - l);
    let f = |n: f64| {
        let k = (n + h.rem_euclid(360.0) / 30.0) % 12.0;
        let v = l - a * (k - 3.0).min(9.0 - k).clamp(-1.0, 1.0);
        (v * 255.0).round() as u8
    };
    (f(0.0), f(8.0), f(4.0))
}
