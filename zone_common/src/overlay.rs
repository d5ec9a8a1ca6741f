//! Zone overlay painting.
//!
//! [`render_overlay`] holds the painting order; backends implement [`OverlaySurface`].
//! All coordinates handed to a surface are canvas-native pixels.

use crate::geometry::Rect;
use crate::zone::{Zone, ZoneForm};

/// Alpha appended to `#RRGGBB` colors for zone fills (0x20 / 255).
pub const FILL_ALPHA_SUFFIX: &str = "20";
pub const LABEL_OFFSET_X: f64 = 16.0;
pub const LABEL_OFFSET_Y: f64 = 6.0;
pub const LABEL_FONT_PX: f32 = 18.0;

pub trait OverlaySurface {
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: &str);
    fn stroke_rect(&mut self, rect: Rect, color: &str, thickness: u32);
    /// Draws `text` with its baseline-bottom at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str);
}

/// Semi-transparent fill for a border color. Only `#RRGGBB` gets the alpha suffix;
/// anything else is used as-is.
pub fn fill_style(color: &str) -> String {
    let six_digit = color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if six_digit {
        format!("{color}{FILL_ALPHA_SUFFIX}")
    } else {
        color.to_string()
    }
}

/// Parses `#RGB`, `#RRGGBB` and `#RRGGBBAA` into RGBA.
pub fn parse_color(color: &str) -> Option<[u8; 4]> {
    let hex = color.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 16 + v;
            }
            Some(out)
        }
        6 => Some([byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?, 255]),
        8 => Some([
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        ]),
        _ => None,
    }
}

fn paint_rect<S: OverlaySurface>(surface: &mut S, rect: Rect, color: &str, thickness: u32) {
    surface.fill_rect(rect, &fill_style(color));
    surface.stroke_rect(rect, color, thickness);
}

/// Clears the surface, paints every zone in registry order, then the in-progress
/// rectangle (styled by the pending form) on top.
pub fn render_overlay<S: OverlaySurface>(
    surface: &mut S,
    zones: &[Zone],
    in_progress: Option<(Rect, &ZoneForm)>,
) {
    surface.clear();

    for zone in zones {
        paint_rect(surface, zone.rect, &zone.color, zone.thickness);
        if !zone.name.is_empty() {
            surface.fill_text(
                &zone.name,
                zone.rect.x + LABEL_OFFSET_X,
                zone.rect.y - LABEL_OFFSET_Y,
                &zone.color,
            );
        }
    }

    if let Some((rect, form)) = in_progress {
        paint_rect(surface, rect, &form.color, form.thickness);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    FillRect { rect: Rect, color: String },
    StrokeRect { rect: Rect, color: String, thickness: u32 },
    Text { text: String, x: f64, y: f64, color: String },
}

/// Surface that records draw calls, for backends that repaint from a list each frame.
#[derive(Debug, Default, Clone)]
pub struct DisplayList {
    ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }
}

impl OverlaySurface for DisplayList {
    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.ops.push(DrawOp::FillRect {
            rect,
            color: color.to_string(),
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: &str, thickness: u32) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color: color.to_string(),
            thickness,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            color: color.to_string(),
        });
    }
}
