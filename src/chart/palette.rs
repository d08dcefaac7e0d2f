//! Bar colors shared by every chart: one highlight color and a rotating pale palette.

use serde::Serialize;

/// A CSS hex color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

/// Dark blue marking the winning model or the top-N bars.
pub const HIGHLIGHT: Color = Color("#00008B");

/// Fallback fills, assigned by position.
pub const PALETTE: [Color; 9] = [
    Color("#FCF9DA"),
    Color("#E0EBF7"),
    Color("#D3EDDB"),
    Color("#F9D7F6"),
    Color("#D0C3F1"),
    Color("#E9F9E5"),
    Color("#CEEEF8"),
    Color("#FFD7EE"),
    Color("#FEF1AB"),
];

impl Color {
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn is_highlight(&self) -> bool {
        *self == HIGHLIGHT
    }

    /// Text color readable on top of this fill.
    pub fn label_ink(&self) -> &'static str {
        if self.is_highlight() {
            "white"
        } else {
            "black"
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Palette entry for a position, wrapping around and tolerating negative offsets.
pub fn palette_at(position: i64) -> Color {
    let len = PALETTE.len() as i64;
    PALETTE[position.rem_euclid(len) as usize]
}

/// `base` with a two-digit hex alpha suffix (`#00008B` at 0.5 -> `#00008B80`).
pub fn shade(base: Color, opacity: f64) -> String {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("{}{:02x}", base.as_str(), alpha)
}

/// One shade per opacity level.
pub fn shades(base: Color, levels: &[f64]) -> Vec<String> {
    levels.iter().map(|&o| shade(base, o)).collect()
}
